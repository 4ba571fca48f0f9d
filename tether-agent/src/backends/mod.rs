// ABOUTME: Backend implementations for the agent execution port.
// ABOUTME: Production backends live with the execution engine; only the test mock is built in.

pub mod mock;
