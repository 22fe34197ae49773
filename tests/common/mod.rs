//! Shared fixtures for router integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use svcdispatch::adapters::{MockAutomation, MockFunctions, MockQueue, MockStateMachines, MockTopics};
use svcdispatch::discovery::StaticDiscovery;
use svcdispatch::{Backends, Router};

/// Every mock adapter, shared with the router under test.
pub struct Mocks {
    pub functions: Arc<MockFunctions>,
    pub state_machines: Arc<MockStateMachines>,
    pub automation: Arc<MockAutomation>,
    pub topics: Arc<MockTopics>,
    pub queues: Arc<MockQueue>,
}

impl Mocks {
    pub fn new() -> Self {
        Self {
            functions: Arc::new(MockFunctions::new()),
            state_machines: Arc::new(MockStateMachines::new()),
            automation: Arc::new(MockAutomation::new()),
            topics: Arc::new(MockTopics::new()),
            queues: Arc::new(MockQueue::new()),
        }
    }

    pub fn backends(&self) -> Backends {
        Backends::new()
            .with_functions(self.functions.clone())
            .with_state_machines(self.state_machines.clone())
            .with_automation(self.automation.clone())
            .with_topics(self.topics.clone())
            .with_queues(self.queues.clone())
    }
}

/// Router over `discovery` with every mock adapter registered.
pub fn router(discovery: StaticDiscovery) -> (Router, Mocks) {
    let mocks = Mocks::new();
    let router = Router::new(Arc::new(discovery), mocks.backends());
    (router, mocks)
}
