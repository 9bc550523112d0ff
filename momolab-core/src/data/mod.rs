//! Bar feeds, bar files and event sinks.

pub mod csv;
pub mod sink;
pub mod source;

pub use self::csv::{load_bars_csv, read_bars_csv, symbol_from_path, CsvError};
pub use sink::{ChannelSink, EventSink, LogSink, SinkError, VecSink};
pub use source::{BarSource, BarStream, ReplaySource, ScriptedSource, StreamError};
