pub mod tracing_event_sink;
