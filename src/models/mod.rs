// Domain models (wire shapes match the original dashboard protocol)

mod counter;
mod load;
mod network;
mod process;
mod wire;

pub use counter::{CounterDelta, CounterState, DiskIo, RawCounterPair};
pub use load::{Family, LoadAverage, LoadReading, LoadRecord, MetricSnapshot};
pub use network::{NETWORK_ROW_BASELINE, NETWORK_ROW_TOTAL, NetworkRecord, NetworkUsage};
pub use process::{ProcessInfo, ProcessList};
pub use wire::{ClientAction, ClientCommand, HostInfo};
