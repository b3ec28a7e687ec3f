//! Agent, service and group registries behind a single routing lock.
//!
//! [`Manager::emit`] takes the lock once and hands a [`Router`] to the
//! routing step. Service handlers receive the same `Router` and re-emit
//! through it, so every event and every event it triggers is routed in one
//! critical section. Two concurrently emitted events are never interleaved.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ebus_core::address::{agent_address, agent_id, service_address};
use ebus_core::{Address, Event};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::agent::Agent;
use crate::metrics::{AGENTS_ACTIVE, EVENTS_DISCARDED_TOTAL, EVENTS_ROUTED_TOTAL, GROUPS_ACTIVE};
use crate::record::RecordStore;
use crate::services::{ServiceRegistry, MANAGE};

/// Topic of the teardown event routed to `@manage`.
pub const DISCONNECTED_TOPIC: &str = "disconnected";

#[derive(Debug)]
struct RoutingTable {
    next_id: u64,
    agents: HashMap<String, Arc<Agent>>,
    groups: HashMap<String, HashSet<String>>,
    event_count: u64,
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            agents: HashMap::new(),
            groups: HashMap::new(),
            event_count: 0,
        }
    }
}

/// Process-scoped routing state. Construct one per server; nothing is global.
#[derive(Debug)]
pub struct Manager {
    table: Mutex<RoutingTable>,
    services: ServiceRegistry,
    records: RecordStore,
}

impl Manager {
    /// Manager with the built-in services.
    pub fn new() -> Self {
        Self::with_services(ServiceRegistry::with_builtins())
    }

    /// Manager with a caller-supplied service registry.
    pub fn with_services(services: ServiceRegistry) -> Self {
        Self {
            table: Mutex::new(RoutingTable::default()),
            services,
            records: RecordStore::new(),
        }
    }

    /// Register `agent` under a freshly minted `&n` address.
    pub fn add_agent(&self, agent: Arc<Agent>) -> String {
        let mut table = self.table.lock();
        let address = agent_address(table.next_id);
        table.next_id += 1;
        let _ = table.agents.insert(address.clone(), agent);
        gauge_agents(&table);
        debug!(%address, "agent registered");
        address
    }

    /// Tear down the agent at `address`: route a `disconnected` event to
    /// `@manage` (which purges its group memberships), then unregister and
    /// close it, all under one lock hold.
    pub fn disconnect(&self, address: &str) {
        let mut table = self.table.lock();
        let mut router = Router {
            table: &mut *table,
            services: &self.services,
            records: &self.records,
        };
        router.emit(
            Event::new(service_address(MANAGE), DISCONNECTED_TOPIC, Vec::<String>::new())
                .with_from(address),
        );
        if let Some(agent) = table.agents.remove(address) {
            agent.close();
            debug!(%address, "agent unregistered");
        }
        gauge_agents(&table);
    }

    /// Route one event.
    pub fn emit(&self, event: Event) {
        let mut table = self.table.lock();
        Router {
            table: &mut *table,
            services: &self.services,
            records: &self.records,
        }
        .emit(event);
    }

    /// Agent registered at `address`.
    pub fn agent(&self, address: &str) -> Option<Arc<Agent>> {
        self.table.lock().agents.get(address).cloned()
    }

    /// Events routed so far, excluding unroutable ones.
    pub fn event_count(&self) -> u64 {
        self.table.lock().event_count
    }

    /// Registered agent addresses, ordered by id.
    pub fn agents(&self) -> Vec<String> {
        sorted_agents(&self.table.lock())
    }

    /// Number of registered agents.
    pub fn agent_count(&self) -> usize {
        self.table.lock().agents.len()
    }

    /// Members of `group`, sorted, or `None` if the group does not exist.
    pub fn group_members(&self, group: &str) -> Option<Vec<String>> {
        self.table.lock().groups.get(group).map(|members| {
            let mut members: Vec<String> = members.iter().cloned().collect();
            members.sort();
            members
        })
    }

    /// Live group ids, sorted.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.table.lock().groups.keys().cloned().collect();
        groups.sort();
        groups
    }

    /// The record store.
    pub fn records(&self) -> &RecordStore {
        &self.records
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}

/// Routing handle valid while the manager lock is held.
///
/// Service handlers use it to re-emit and to read or mutate group
/// membership. It cannot outlive the routing call that created it.
pub struct Router<'a> {
    table: &'a mut RoutingTable,
    services: &'a ServiceRegistry,
    records: &'a RecordStore,
}

impl Router<'_> {
    /// Route one event to an agent mailbox or a service handler.
    ///
    /// Group ids and empty addresses are not routable: the event is dropped
    /// and does not count towards the event counter.
    pub fn emit(&mut self, event: Event) {
        self.table.event_count += 1;
        match Address::parse(&event.to) {
            Address::Agent(address) => {
                if let Some(agent) = self.table.agents.get(address) {
                    agent.mailbox().emit(event);
                    metrics::counter!(EVENTS_ROUTED_TOTAL, "kind" => "agent").increment(1);
                } else {
                    debug!(to = %event.to, topic = %event.topic, "dropping event for unknown agent");
                }
            }
            Address::Service(name) => {
                let services = self.services;
                if let Some(service) = services.get(name) {
                    metrics::counter!(EVENTS_ROUTED_TOTAL, "kind" => "service").increment(1);
                    service.call(event, self);
                } else {
                    debug!(to = %event.to, topic = %event.topic, "dropping event for unknown service");
                }
            }
            Address::Group(_) | Address::Invalid => {
                self.table.event_count -= 1;
                metrics::counter!(EVENTS_DISCARDED_TOTAL, "reason" => "unroutable").increment(1);
                warn!(
                    from = %event.from,
                    to = %event.to,
                    topic = %event.topic,
                    "discarding event with unroutable address"
                );
            }
        }
    }

    /// Add `agent` to `group`. Returns `false` if the agent is unknown.
    pub fn join(&mut self, group: &str, agent: &str) -> bool {
        let Some(handle) = self.table.agents.get(agent) else {
            debug!(%group, %agent, "join from unknown agent ignored");
            return false;
        };
        handle.record_join(group);
        let _ = self
            .table
            .groups
            .entry(group.to_owned())
            .or_default()
            .insert(agent.to_owned());
        gauge_groups(&*self.table);
        true
    }

    /// Remove `agent` from `group`, deleting the group once empty.
    pub fn leave(&mut self, group: &str, agent: &str) {
        if let Some(handle) = self.table.agents.get(agent) {
            handle.record_leave(group);
        }
        if let Some(members) = self.table.groups.get_mut(group) {
            let _ = members.remove(agent);
            if members.is_empty() {
                let _ = self.table.groups.remove(group);
            }
        }
        gauge_groups(&*self.table);
    }

    /// Snapshot of `group`'s members, unordered. Empty for unknown groups.
    pub fn members(&self, group: &str) -> Vec<String> {
        self.table
            .groups
            .get(group)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Registered agent addresses, ordered by id.
    pub fn agents(&self) -> Vec<String> {
        sorted_agents(&*self.table)
    }

    /// Agent registered at `address`.
    pub fn agent(&self, address: &str) -> Option<&Arc<Agent>> {
        self.table.agents.get(address)
    }

    /// Current event counter.
    pub fn event_count(&self) -> u64 {
        self.table.event_count
    }

    /// The record store.
    pub fn records(&self) -> &RecordStore {
        self.records
    }
}

fn sorted_agents(table: &RoutingTable) -> Vec<String> {
    let mut agents: Vec<String> = table.agents.keys().cloned().collect();
    agents.sort_by_key(|address| agent_id(address).unwrap_or(u64::MAX));
    agents
}

#[allow(clippy::cast_precision_loss)]
fn gauge_agents(table: &RoutingTable) {
    metrics::gauge!(AGENTS_ACTIVE).set(table.agents.len() as f64);
}

#[allow(clippy::cast_precision_loss)]
fn gauge_groups(table: &RoutingTable) {
    metrics::gauge!(GROUPS_ACTIVE).set(table.groups.len() as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn connect(manager: &Manager) -> (String, Arc<Agent>) {
        let agent = Arc::new(Agent::new());
        let address = manager.add_agent(Arc::clone(&agent));
        (address, agent)
    }

    fn drain(agent: &Agent) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = agent.mailbox().pop_front() {
            events.push(event);
        }
        events
    }

    struct Echo(Arc<AtomicUsize>);

    impl crate::Service for Echo {
        fn call(&self, event: Event, router: &mut Router<'_>) {
            let _ = self.0.fetch_add(1, Ordering::SeqCst);
            router.emit(event.reply("@echo", event.topic.clone(), event.data.clone()));
        }
    }

    fn send(manager: &Manager, from: &str, to: &str, topic: &str, data: &[&str]) {
        manager.emit(Event::new(to, topic, data.iter().copied()).with_from(from));
    }

    #[test]
    fn addresses_are_monotonic_and_never_reused() {
        let manager = Manager::new();
        let (a, _) = connect(&manager);
        let (b, _) = connect(&manager);
        assert_eq!(a, "&1");
        assert_eq!(b, "&2");
        manager.disconnect(&a);
        let (c, _) = connect(&manager);
        assert_eq!(c, "&3");
        assert_eq!(manager.agents(), vec!["&2".to_string(), "&3".to_string()]);
    }

    #[test]
    fn agents_sorted_numerically() {
        let manager = Manager::new();
        for _ in 0..11 {
            let _ = connect(&manager);
        }
        let agents = manager.agents();
        assert_eq!(agents.first().map(String::as_str), Some("&1"));
        assert_eq!(agents.get(1).map(String::as_str), Some("&2"));
        assert_eq!(agents.last().map(String::as_str), Some("&11"));
    }

    #[test]
    fn emit_to_live_agent_delivers_exact_event() {
        let manager = Manager::new();
        let (a, _) = connect(&manager);
        let (b, agent_b) = connect(&manager);

        send(&manager, &a, &b, "hello", &["x", "", "y z"]);

        let events = drain(&agent_b);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from, a);
        assert_eq!(events[0].to, b);
        assert_eq!(events[0].topic, "hello");
        assert_eq!(events[0].data, vec!["x", "", "y z"]);
        assert_eq!(manager.event_count(), 1);
    }

    #[test]
    fn emit_to_unknown_agent_is_dropped_but_counted() {
        let manager = Manager::new();
        let (a, agent_a) = connect(&manager);
        send(&manager, &a, "&999", "hello", &[]);
        assert!(drain(&agent_a).is_empty());
        assert_eq!(manager.event_count(), 1);
    }

    #[test]
    fn unroutable_address_nets_zero_count() {
        let manager = Manager::new();
        let (a, _) = connect(&manager);
        send(&manager, &a, "", "hello", &[]);
        send(&manager, &a, "some-group", "hello", &[]);
        assert_eq!(manager.event_count(), 0);
    }

    #[test]
    fn custom_service_receives_event_and_can_reply() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut services = ServiceRegistry::new();
        services.register("echo", Echo(Arc::clone(&calls)));
        let manager = Manager::with_services(services);
        let (a, agent_a) = connect(&manager);

        send(&manager, &a, "@echo", "ping", &["1"]);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let events = drain(&agent_a);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].from, "@echo");
        assert_eq!(events[0].topic, "ping");
        assert_eq!(events[0].data, vec!["1"]);
        // The request and the reply both count.
        assert_eq!(manager.event_count(), 2);
    }

    #[test]
    fn unknown_service_is_dropped() {
        let manager = Manager::with_services(ServiceRegistry::new());
        let (a, agent_a) = connect(&manager);
        send(&manager, &a, "@nothing", "x", &[]);
        assert!(drain(&agent_a).is_empty());
    }

    #[test]
    fn join_from_unknown_agent_is_noop() {
        let manager = Manager::new();
        send(&manager, "&42", "@join", "g", &[]);
        assert!(manager.group_members("g").is_none());
        assert!(manager.groups().is_empty());
    }

    #[test]
    fn disconnect_purges_memberships_and_empty_groups() {
        let manager = Manager::new();
        let (a, agent_a) = connect(&manager);
        let (b, _) = connect(&manager);

        send(&manager, &a, "@join", "g1", &[]);
        send(&manager, &a, "@join", "g2", &[]);
        send(&manager, &b, "@join", "g2", &[]);
        assert_eq!(agent_a.joined_groups(), vec!["g1", "g2"]);

        manager.disconnect(&a);

        assert!(agent_a.is_closed());
        assert!(manager.agent(&a).is_none());
        assert!(manager.group_members("g1").is_none());
        assert_eq!(manager.group_members("g2"), Some(vec![b.clone()]));
        assert_eq!(manager.groups(), vec!["g2"]);
    }

    #[test]
    fn disconnected_address_is_unroutable() {
        let manager = Manager::new();
        let (a, agent_a) = connect(&manager);
        manager.disconnect(&a);
        assert!(agent_a.is_closed());
        send(&manager, "&9", &a, "late", &[]);
        assert!(agent_a.mailbox().is_empty());
        assert_eq!(manager.agent_count(), 0);
    }

    #[test]
    fn concurrent_emits_keep_per_sender_order() {
        let manager = Arc::new(Manager::new());
        let (sink, agent) = connect(&manager);
        let senders: Vec<String> = (0..4).map(|_| connect(&manager).0).collect();

        let handles: Vec<_> = senders
            .iter()
            .cloned()
            .map(|from| {
                let manager = Arc::clone(&manager);
                let sink = sink.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        manager.emit(
                            Event::new(sink.as_str(), "n", [i.to_string()]).with_from(from.as_str()),
                        );
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let events = drain(&agent);
        assert_eq!(events.len(), 400);
        for from in &senders {
            let seq: Vec<u32> = events
                .iter()
                .filter(|e| &e.from == from)
                .map(|e| e.data[0].parse().unwrap())
                .collect();
            assert_eq!(seq, (0..100).collect::<Vec<_>>());
        }
        assert_eq!(manager.event_count(), 400);
    }
}
