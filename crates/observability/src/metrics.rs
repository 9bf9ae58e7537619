//! Dispatcher 指标记录模块
//!
//! 通过 `metrics` facade 记录投递事件；未安装 recorder 时为空操作。

use contracts::WriteMode;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};

/// 注册指标说明（安装 exporter 后调用一次）
pub fn describe_metrics() {
    describe_counter!(
        "fanout_writes_accepted_total",
        "Writes accepted by the dispatcher, by mode"
    );
    describe_counter!(
        "fanout_bytes_accepted_total",
        Unit::Bytes,
        "Payload bytes accepted by the dispatcher"
    );
    describe_counter!(
        "fanout_writes_rejected_total",
        "Writes rejected because the dispatcher was closing"
    );
    describe_counter!("fanout_passes_total", "Delivery passes, by mode and status");
    describe_counter!(
        "fanout_destination_failures_total",
        "Passes aborted by a destination, by destination and reason"
    );
    describe_gauge!("fanout_destinations", "Destinations in the last completed pass");
    describe_gauge!("fanout_queue_depth", "Payloads waiting in the buffered queue");
    describe_histogram!(
        "fanout_pass_duration_us",
        Unit::Microseconds,
        "Time spent delivering one payload to every destination"
    );
}

/// 记录被接受的写入
pub fn record_write_accepted(mode: WriteMode, bytes: usize) {
    counter!("fanout_writes_accepted_total", "mode" => mode.as_str()).increment(1);
    counter!("fanout_bytes_accepted_total", "mode" => mode.as_str()).increment(bytes as u64);
}

/// 记录因关闭而被拒绝的写入
pub fn record_write_rejected(mode: WriteMode) {
    counter!("fanout_writes_rejected_total", "mode" => mode.as_str()).increment(1);
}

/// 记录一次完整的投递轮次
///
/// `destinations` 为本轮快照中的目标数量。
pub fn record_pass_completed(mode: WriteMode, destinations: usize, elapsed_us: f64) {
    counter!("fanout_passes_total", "mode" => mode.as_str(), "status" => "success").increment(1);
    gauge!("fanout_destinations").set(destinations as f64);
    histogram!("fanout_pass_duration_us", "mode" => mode.as_str()).record(elapsed_us);
}

/// 记录一次失败的投递轮次
pub fn record_pass_failed(mode: WriteMode, destination: &str, short_write: bool) {
    let reason = if short_write { "short_write" } else { "error" };
    counter!("fanout_passes_total", "mode" => mode.as_str(), "status" => "failure").increment(1);
    counter!(
        "fanout_destination_failures_total",
        "destination" => destination.to_string(),
        "reason" => reason
    )
    .increment(1);
}

/// 记录缓冲队列深度
pub fn record_queue_depth(depth: usize) {
    gauge!("fanout_queue_depth").set(depth as f64);
}
