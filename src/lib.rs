pub mod burstcull_core;
