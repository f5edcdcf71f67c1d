pub mod bluetooth;
pub mod input_simulator;
pub mod instance;
pub mod logging;
