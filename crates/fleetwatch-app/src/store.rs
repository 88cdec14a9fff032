//! 실시간 상태 저장소.
//!
//! 서버에서 받은 장치/위치/이벤트/로그를 메모리에 미러링한다.
//! 쓰기는 소켓 컨트롤러만 수행하고, 읽기는 어디서나 스냅샷으로 한다.

use fleetwatch_core::config::AppConfig;
use fleetwatch_core::models::device::Device;
use fleetwatch_core::models::event::Event;
use fleetwatch_core::models::log::LogEntry;
use fleetwatch_core::models::position::Position;
use parking_lot::RwLock;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

/// 보관 한도
#[derive(Debug, Clone, Copy)]
pub struct StoreLimits {
    /// 이벤트 저장 여부
    pub keep_events: bool,
    /// 최근 이벤트 최대 수
    pub max_events: usize,
    /// 장치 로그 저장 여부
    pub keep_logs: bool,
    /// 장치 로그 최대 수
    pub max_logs: usize,
}

impl StoreLimits {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            keep_events: !config.events.disabled,
            max_events: config.events.max_retained,
            keep_logs: config.logs.enabled,
            max_logs: config.logs.max_retained,
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    devices: BTreeMap<i64, Device>,
    /// 장치 ID → 최신 위치
    positions: BTreeMap<i64, Position>,
    /// 최신 이벤트가 앞
    events: VecDeque<Event>,
    logs: VecDeque<LogEntry>,
}

/// 실시간 상태 저장소
pub struct FleetStore {
    limits: StoreLimits,
    state: RwLock<StoreState>,
}

/// Arc로 감싼 FleetStore
pub type SharedFleetStore = Arc<FleetStore>;

impl FleetStore {
    pub fn new(limits: StoreLimits) -> Self {
        Self {
            limits,
            state: RwLock::new(StoreState::default()),
        }
    }

    // ── 장치 ──

    /// 전체 장치 목록 교체 (초기 로드, 재동기화)
    pub fn refresh_devices(&self, devices: Vec<Device>) {
        let mut state = self.state.write();
        state.devices = devices.into_iter().map(|d| (d.id, d)).collect();
    }

    /// 장치 병합 (소켓 수신분)
    pub fn update_devices(&self, devices: Vec<Device>) {
        let mut state = self.state.write();
        for device in devices {
            state.devices.insert(device.id, device);
        }
    }

    pub fn device(&self, id: i64) -> Option<Device> {
        self.state.read().devices.get(&id).cloned()
    }

    pub fn devices(&self) -> Vec<Device> {
        self.state.read().devices.values().cloned().collect()
    }

    pub fn device_count(&self) -> usize {
        self.state.read().devices.len()
    }

    // ── 위치 ──

    /// 전체 위치 교체 (재동기화)
    pub fn replace_positions(&self, positions: Vec<Position>) {
        let mut state = self.state.write();
        state.positions = positions.into_iter().map(|p| (p.device_id, p)).collect();
    }

    /// 장치별 최신 위치 갱신 (소켓 수신분)
    pub fn update_positions(&self, positions: Vec<Position>) {
        let mut state = self.state.write();
        for position in positions {
            state.positions.insert(position.device_id, position);
        }
    }

    pub fn position(&self, device_id: i64) -> Option<Position> {
        self.state.read().positions.get(&device_id).cloned()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.state.read().positions.values().cloned().collect()
    }

    // ── 이벤트 ──

    /// 이벤트 추가 (최신이 앞, 한도 초과분은 오래된 것부터 제거)
    ///
    /// 이벤트 저장이 꺼져 있으면 아무것도 하지 않는다.
    pub fn add_events(&self, events: &[Event]) {
        if !self.limits.keep_events {
            return;
        }
        let mut state = self.state.write();
        for event in events {
            state.events.push_front(event.clone());
        }
        state.events.truncate(self.limits.max_events);
    }

    /// 최근 이벤트 (최신순)
    pub fn events(&self) -> Vec<Event> {
        self.state.read().events.iter().cloned().collect()
    }

    // ── 로그 ──

    /// 장치 로그 추가 (오래된 것부터 제거)
    pub fn append_logs(&self, logs: Vec<LogEntry>) {
        if !self.limits.keep_logs {
            return;
        }
        let mut state = self.state.write();
        state.logs.extend(logs);
        while state.logs.len() > self.limits.max_logs {
            state.logs.pop_front();
        }
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.state.read().logs.iter().cloned().collect()
    }

    /// 로그아웃 시 전체 초기화
    pub fn clear(&self) {
        *self.state.write() = StoreState::default();
    }
}
