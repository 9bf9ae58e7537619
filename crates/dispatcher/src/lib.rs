//! # Dispatcher
//!
//! 字节流扇出分发模块。
//!
//! 负责：
//! - 接收字节写入（`Buffered` 入队 / `Immediate` 直接投递）
//! - 按注册顺序 fan-out 到所有 destinations
//! - `close()` 时排空队列后再返回
//!
//! ```no_run
//! use dispatcher::{Dispatcher, DispatcherConfig, WriterDestination};
//!
//! # async fn run() -> Result<(), dispatcher::DispatcherError> {
//! let dispatcher = Dispatcher::new(DispatcherConfig::default())?;
//! dispatcher.add_destination(WriterDestination::stdout());
//! dispatcher.write(b"hello\n").await?;
//! dispatcher.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod destinations;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod shutdown;

mod fanout;
mod queue;
mod worker;

pub use contracts::{Destination, DispatcherConfig, WriteMode};
pub use destinations::{
    FileDestination, FileDestinationConfig, LogDestination, MemoryDestination, WriterDestination,
};
pub use dispatcher::{Dispatcher, DispatcherBuilder, create_destination, create_dispatcher};
pub use error::{DeliveryFailure, DispatcherError};
pub use metrics::{DeliveryMetrics, MetricsSnapshot};
pub use registry::DestinationRegistry;
pub use shutdown::Lifecycle;
