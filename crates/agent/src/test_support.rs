//! In-memory stand-ins for the store, identity provider, and email sender.
//! They share a `Journal` so tests can assert on the order of side effects.
use crate::alerts::{EmailSender, Notifier, Pipeline};
use crate::identity::{IdentityLookup, UserLookup, UserProfile};
use crate::store::AlertStore;
use models::{Alert, AlertId, NewAlert, SentStatus};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    IdentityLookup(String),
    OverrideLookup(String),
    Sent { alert_id: AlertId, to: String },
    MarkedSent(AlertId),
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
    fn record(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }
}

pub fn alert(id: i64, home_id: Option<&str>, user_id: Option<&str>, message: &str) -> Alert {
    let created_at = chrono::DateTime::parse_from_rfc3339("2025-08-09T10:11:05Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    Alert {
        id: AlertId::new(id),
        home_id: home_id.map(str::to_string),
        user_id: user_id.map(str::to_string),
        device_id: Some("d1".to_string()),
        message: message.to_string(),
        sent_status: SentStatus::Unsent,
        created_at: created_at + chrono::Duration::seconds(id),
    }
}

pub fn pipeline(
    store: &MemoryStore,
    identity: &FakeIdentity,
    sender: &TestSender,
) -> Pipeline<MemoryStore, FakeIdentity, TestSender> {
    Pipeline::new(
        store.clone(),
        identity.clone(),
        Notifier::new(sender.clone()).unwrap(),
    )
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    alerts: Vec<Alert>,
    overrides: BTreeMap<String, String>,
    fail_fetches: bool,
    fail_inserts: bool,
    fail_override_lookups: bool,
    fail_mark_sent: BTreeSet<AlertId>,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
    journal: Journal,
}

impl MemoryStore {
    pub fn new(journal: &Journal) -> Self {
        Self {
            inner: Default::default(),
            journal: journal.clone(),
        }
    }

    pub fn set_override(&self, home_id: &str, email: &str) {
        let mut lock = self.inner.lock().unwrap();
        lock.overrides.insert(home_id.to_string(), email.to_string());
    }

    /// Adds a pending alert, created after every alert added before it.
    pub fn push_alert(
        &self,
        home_id: Option<&str>,
        user_id: Option<&str>,
        message: &str,
    ) -> AlertId {
        let mut lock = self.inner.lock().unwrap();
        let alert = alert(lock.alerts.len() as i64 + 1, home_id, user_id, message);
        let id = alert.id;
        lock.alerts.push(alert);
        id
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.inner.lock().unwrap().alerts.clone()
    }

    pub fn status(&self, id: AlertId) -> SentStatus {
        let lock = self.inner.lock().unwrap();
        lock.alerts
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.sent_status)
            .expect("alert must exist")
    }

    pub fn fail_fetches(&self) {
        self.inner.lock().unwrap().fail_fetches = true;
    }

    pub fn fail_inserts(&self) {
        self.inner.lock().unwrap().fail_inserts = true;
    }

    pub fn fail_override_lookups(&self) {
        self.inner.lock().unwrap().fail_override_lookups = true;
    }

    pub fn fail_mark_sent(&self, id: AlertId) {
        self.inner.lock().unwrap().fail_mark_sent.insert(id);
    }
}

impl AlertStore for MemoryStore {
    async fn fetch_pending<'s>(&'s self, limit: u32) -> anyhow::Result<Vec<Alert>> {
        let lock = self.inner.lock().unwrap();
        if lock.fail_fetches {
            anyhow::bail!("mock store error fetching alerts");
        }
        let mut pending = lock
            .alerts
            .iter()
            .filter(|a| a.sent_status == SentStatus::Unsent)
            .cloned()
            .collect::<Vec<_>>();
        pending.sort_by_key(|a| (a.created_at, a.id));
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn insert_alert<'s>(&'s self, new_alert: &'s NewAlert) -> anyhow::Result<Alert> {
        let mut lock = self.inner.lock().unwrap();
        if lock.fail_inserts {
            anyhow::bail!("mock store error inserting alert");
        }
        let mut stored = alert(
            lock.alerts.len() as i64 + 1,
            Some(&new_alert.home_id),
            new_alert.user_id.as_deref(),
            &new_alert.message,
        );
        stored.device_id = Some(new_alert.device_id.clone());
        lock.alerts.push(stored.clone());
        Ok(stored)
    }

    async fn mark_sent<'s>(&'s self, id: AlertId) -> anyhow::Result<()> {
        let mut lock = self.inner.lock().unwrap();
        if lock.fail_mark_sent.contains(&id) {
            anyhow::bail!("mock store error marking alert {id} sent");
        }
        let Some(alert) = lock.alerts.iter_mut().find(|a| a.id == id) else {
            anyhow::bail!("alert {id} does not exist");
        };
        alert.sent_status = SentStatus::Sent;
        self.journal.record(Event::MarkedSent(id));
        Ok(())
    }

    async fn home_override_email<'s>(&'s self, home_id: &'s str) -> anyhow::Result<Option<String>> {
        self.journal.record(Event::OverrideLookup(home_id.to_string()));
        let lock = self.inner.lock().unwrap();
        if lock.fail_override_lookups {
            anyhow::bail!("mock store error fetching override for '{home_id}'");
        }
        Ok(lock.overrides.get(home_id).cloned())
    }
}

#[derive(Debug, Clone)]
enum StubUser {
    Found(UserProfile),
    Broken,
}

#[derive(Debug, Clone)]
pub struct FakeIdentity {
    users: Arc<Mutex<BTreeMap<String, StubUser>>>,
    journal: Journal,
}

impl FakeIdentity {
    pub fn new(journal: &Journal) -> Self {
        Self {
            users: Default::default(),
            journal: journal.clone(),
        }
    }

    pub fn add_user(&self, user_id: &str, first_name: Option<&str>, email: Option<&str>) {
        let profile = UserProfile {
            first_name: first_name.map(str::to_string),
            primary_email: email.map(str::to_string),
        };
        let mut lock = self.users.lock().unwrap();
        lock.insert(user_id.to_string(), StubUser::Found(profile));
    }

    /// Lookups of this user fail with a provider error.
    pub fn fail_user(&self, user_id: &str) {
        let mut lock = self.users.lock().unwrap();
        lock.insert(user_id.to_string(), StubUser::Broken);
    }
}

impl IdentityLookup for FakeIdentity {
    async fn get_user<'s>(&'s self, user_id: &'s str) -> UserLookup {
        self.journal.record(Event::IdentityLookup(user_id.to_string()));
        let lock = self.users.lock().unwrap();
        match lock.get(user_id) {
            Some(StubUser::Found(profile)) => UserLookup::Found(profile.clone()),
            Some(StubUser::Broken) => {
                UserLookup::Failed(anyhow::anyhow!("mock identity provider error"))
            }
            None => UserLookup::NotFound,
        }
    }
}

#[derive(Debug, Default)]
struct TestSenderInner {
    fail_for: BTreeSet<String>,
    sent: Vec<notifications::NotificationEmail>,
}

#[derive(Debug, Clone)]
pub struct TestSender {
    inner: Arc<Mutex<TestSenderInner>>,
    journal: Journal,
}

impl TestSender {
    pub fn new(journal: &Journal) -> Self {
        Self {
            inner: Default::default(),
            journal: journal.clone(),
        }
    }

    pub fn take_sent(&self) -> Vec<notifications::NotificationEmail> {
        let mut lock = self.inner.lock().unwrap();
        std::mem::take(&mut lock.sent)
    }

    /// Sends to this address fail with a delivery error.
    pub fn fail_for(&self, email: &str) {
        let mut lock = self.inner.lock().unwrap();
        lock.fail_for.insert(email.to_string());
    }
}

impl EmailSender for TestSender {
    async fn send<'s>(
        &'s self,
        notification: notifications::NotificationEmail,
    ) -> anyhow::Result<String> {
        let mut lock = self.inner.lock().unwrap();
        if lock.fail_for.contains(&notification.recipient.email) {
            anyhow::bail!(
                "mock error sending alert email to '{}'",
                notification.recipient.email
            );
        }
        self.journal.record(Event::Sent {
            alert_id: notification.alert_id,
            to: notification.recipient.email.clone(),
        });
        let delivery_id = format!("test-delivery-{}", notification.alert_id);
        lock.sent.push(notification);
        Ok(delivery_id)
    }
}
