pub mod logs;
pub mod run;
pub mod runs;
pub mod targets;
pub mod watch;

#[cfg(test)]
pub(crate) mod testing;
