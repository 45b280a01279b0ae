pub mod cipher;
pub mod convert;
pub mod datafile;
pub mod flags;
pub mod live;
pub mod messages;
pub mod naming;
pub mod pipeline;
pub mod reader;
pub mod reconcile;
