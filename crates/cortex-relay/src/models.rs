pub mod agent_request;
