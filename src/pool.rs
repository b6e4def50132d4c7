use std::{collections::HashMap, future::Future, sync::Arc};

use dashmap::DashMap;
use futures::future::join_all;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    config::{PoolOptions, RelayConfig, RelayPermissions},
    envelopes::{CloseRequest, CountRequest, ReqRequest},
    keys::SigningError,
    normalize::normalize_url,
    observers::{ObserverKey, Observers},
    relay::{Notification, Relay, RelayError},
    Event, EventTemplate, Keys, SecretKey,
};

#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    #[error("URL normalization error")]
    Normalize(#[from] url::ParseError),

    #[error("relay {0} is not in the pool")]
    UnknownRelay(Url),

    #[error("the pool has no secret key to sign with")]
    ReadOnlyKeys,

    #[error("failed to sign: {0}")]
    Signing(#[from] SigningError),

    #[error(transparent)]
    Relay(#[from] RelayFailure),
}

/// what went wrong on one relay of a broadcast
#[derive(thiserror::Error, Debug)]
#[error("[{relay_url}] {error}")]
pub struct RelayFailure {
    pub relay_url: Url,
    #[source]
    pub error: RelayError,
}

/// a relay notification, tagged with where it came from
#[derive(Debug, Clone)]
pub struct Occurrence {
    pub relay_url: Url,
    pub notification: Notification,
}

/// result of sending REQ or COUNT to several relays
#[derive(Debug, Default)]
pub struct SubscriptionOutcome {
    /// the id each relay got the request under
    pub subscription_ids: HashMap<Url, String>,
    pub failures: Vec<RelayFailure>,
}

/// pipes one relay's notifications into the pool's observers
#[derive(Debug)]
struct Forwarder {
    key: ObserverKey,
    task: JoinHandle<()>,
}

#[derive(Debug)]
struct Entry {
    relay: Relay,
    forwarder: Option<Forwarder>,
}

impl Entry {
    fn attach(&mut self, observers: &Arc<Observers<Occurrence>>) {
        if self.forwarder.is_some() {
            return;
        }

        let (key, mut notifications) = self.relay.subscribe();
        let relay_url = self.relay.url().clone();
        let observers = observers.clone();
        let task = tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                observers.notify(Occurrence {
                    relay_url: relay_url.clone(),
                    notification,
                });
            }
        });
        self.forwarder = Some(Forwarder { key, task });
    }

    fn detach(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            self.relay.unsubscribe(forwarder.key);
            forwarder.task.abort();
        }
    }
}

impl Drop for Entry {
    fn drop(&mut self) {
        self.detach();
    }
}

/// a set of relay sessions driven together
#[derive(Debug, Clone)]
pub struct Pool {
    relays: Arc<DashMap<Url, Entry>>,
    observers: Arc<Observers<Occurrence>>,
    keys: Option<Keys>,
}

impl Pool {
    pub fn new(options: PoolOptions) -> Self {
        Self {
            relays: Arc::new(DashMap::new()),
            observers: Arc::new(Observers::new()),
            keys: options.keys,
        }
    }

    pub fn keys(&self) -> Option<&Keys> {
        self.keys.as_ref()
    }

    /// returns false when the relay was already there, in which case nothing changes
    ///
    /// its notifications reach the pool observers once it is connected through the pool.
    pub fn add_relay(&self, mut config: RelayConfig) -> bool {
        // configs built by hand may carry a url that never went through normalization
        if let Ok(url) = normalize_url(config.url.as_str()) {
            config.url = url;
        }
        match self.relays.entry(config.url.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                log::info!("[{}] added to the pool", config.url);
                vacant.insert(Entry {
                    relay: Relay::new(config),
                    forwarder: None,
                });
                true
            }
        }
    }

    /// detach and disconnect a relay, then forget it
    pub async fn remove_relay(&self, url: &str) -> Result<(), PoolError> {
        let url = normalize_url(url)?;
        let Some((_, mut entry)) = self.relays.remove(&url) else {
            return Err(PoolError::UnknownRelay(url));
        };
        entry.detach();
        if let Err(error) = entry.relay.disconnect(None).await {
            log::warn!("[{}] failed to disconnect while removing: {}", url, error);
        }
        Ok(())
    }

    pub fn relay(&self, url: &str) -> Option<Relay> {
        let url = normalize_url(url).ok()?;
        self.relays.get(&url).map(|entry| entry.relay.clone())
    }

    pub fn urls(&self) -> Vec<Url> {
        self.relays.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn set_permissions(
        &self,
        url: &str,
        permissions: RelayPermissions,
    ) -> Result<(), PoolError> {
        self.select(Some(url))?
            .into_iter()
            .for_each(|relay| relay.set_permissions(permissions));
        Ok(())
    }

    /// listen to the notifications of every relay in the pool
    pub fn subscribe(&self) -> (ObserverKey, mpsc::UnboundedReceiver<Occurrence>) {
        self.observers.subscribe()
    }

    pub fn unsubscribe(&self, key: ObserverKey) -> bool {
        self.observers.unsubscribe(key)
    }

    pub async fn connect_all(&self, cancel: Option<&CancellationToken>) -> Vec<RelayFailure> {
        self.connect_relays(self.all(), cancel).await
    }

    pub async fn connect(
        &self,
        url: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), PoolError> {
        let relays = self.select(Some(url))?;
        into_single(self.connect_relays(relays, cancel).await)
    }

    pub async fn disconnect_all(&self, cancel: Option<&CancellationToken>) -> Vec<RelayFailure> {
        self.disconnect_relays(self.all(), cancel).await
    }

    pub async fn disconnect(
        &self,
        url: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), PoolError> {
        let relays = self.select(Some(url))?;
        into_single(self.disconnect_relays(relays, cancel).await)
    }

    pub async fn reconnect_all(&self, cancel: Option<&CancellationToken>) -> Vec<RelayFailure> {
        self.reconnect_relays(self.all(), cancel).await
    }

    pub async fn reconnect(
        &self,
        url: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), PoolError> {
        let relays = self.select(Some(url))?;
        into_single(self.reconnect_relays(relays, cancel).await)
    }

    /// send a raw text frame to every connected relay, or only to `target`
    pub async fn send_text(
        &self,
        text: &str,
        target: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<RelayFailure>, PoolError> {
        let relays = self.select_connected(target)?;
        let results = fan_out(relays, |relay| async move { relay.send_text(text, cancel).await })
            .await;
        Ok(failures(results))
    }

    /// like [`Pool::send_text`] for a payload that should hold utf-8
    pub async fn send_bytes(
        &self,
        bytes: &[u8],
        target: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<RelayFailure>, PoolError> {
        let relays = self.select_connected(target)?;
        let results =
            fan_out(relays, |relay| async move { relay.send_bytes(bytes, cancel).await }).await;
        Ok(failures(results))
    }

    /// send a signed event to every relay, or only to `target`
    ///
    /// relays we may not write to are skipped and reported as failures.
    pub async fn send_event(
        &self,
        event: &Event,
        target: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<RelayFailure>, PoolError> {
        let relays = self.select(target)?;
        let results = fan_out(relays, |relay| async move {
            if !relay.permissions().can_write() {
                return Err(RelayError::WriteNotAllowed);
            }
            relay.send_event(event, cancel).await
        })
        .await;
        Ok(failures(results))
    }

    /// sign `template` with the pool's key, then send it like [`Pool::send_event`]
    pub async fn publish(
        &self,
        template: EventTemplate,
        target: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(Event, Vec<RelayFailure>), PoolError> {
        let event = template.sign(self.secret_key()?)?;
        let failures = self.send_event(&event, target, cancel).await?;
        Ok((event, failures))
    }

    /// answer a relay's AUTH challenge with the pool's key
    pub async fn authenticate(
        &self,
        url: &str,
        challenge: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<Event, PoolError> {
        let url = normalize_url(url)?;
        let relay = self
            .relays
            .get(&url)
            .map(|entry| entry.relay.clone())
            .ok_or_else(|| PoolError::UnknownRelay(url))?;
        let event = EventTemplate::auth(relay.url().as_str(), challenge).sign(self.secret_key()?)?;
        relay
            .send_authentication(&event, cancel)
            .await
            .map_err(|error| RelayFailure {
                relay_url: relay.url().clone(),
                error,
            })?;
        Ok(event)
    }

    /// send a REQ to every connected relay, or only to `target`
    pub async fn send_filter(
        &self,
        request: ReqRequest,
        target: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<SubscriptionOutcome, PoolError> {
        let relays = self.select_connected(target)?;
        let request = &request;
        let results = fan_out(relays, |relay| async move {
            if !relay.permissions().can_read() {
                return Err(RelayError::ReadNotAllowed);
            }
            relay.send_filter(request.clone(), cancel).await
        })
        .await;
        Ok(subscription_outcome(results))
    }

    /// send a COUNT to every connected relay, or only to `target`
    pub async fn send_count(
        &self,
        request: CountRequest,
        target: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<SubscriptionOutcome, PoolError> {
        let relays = self.select_connected(target)?;
        let request = &request;
        let results = fan_out(relays, |relay| async move {
            if !relay.permissions().can_read() {
                return Err(RelayError::ReadNotAllowed);
            }
            relay.send_count(request.clone(), cancel).await
        })
        .await;
        Ok(subscription_outcome(results))
    }

    /// send a CLOSE to every connected relay, or only to `target`
    pub async fn send_close(
        &self,
        request: CloseRequest,
        target: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<RelayFailure>, PoolError> {
        let relays = self.select_connected(target)?;
        let request = &request;
        let results = fan_out(relays, |relay| async move {
            relay.send_close(request.clone(), cancel).await
        })
        .await;
        Ok(failures(results))
    }

    fn secret_key(&self) -> Result<&SecretKey, PoolError> {
        self.keys
            .as_ref()
            .and_then(Keys::secret_key)
            .ok_or(PoolError::ReadOnlyKeys)
    }

    async fn connect_relays(
        &self,
        relays: Vec<Relay>,
        cancel: Option<&CancellationToken>,
    ) -> Vec<RelayFailure> {
        for relay in &relays {
            self.with_entry(relay.url(), |entry| entry.attach(&self.observers));
        }
        failures(fan_out(relays, |relay| async move { relay.connect(cancel).await }).await)
    }

    async fn disconnect_relays(
        &self,
        relays: Vec<Relay>,
        cancel: Option<&CancellationToken>,
    ) -> Vec<RelayFailure> {
        // nobody hears from a relay that is going away
        for relay in &relays {
            self.with_entry(relay.url(), Entry::detach);
        }
        failures(fan_out(relays, |relay| async move { relay.disconnect(cancel).await }).await)
    }

    async fn reconnect_relays(
        &self,
        relays: Vec<Relay>,
        cancel: Option<&CancellationToken>,
    ) -> Vec<RelayFailure> {
        let results = fan_out(relays, |relay| async move {
            self.with_entry(relay.url(), Entry::detach);
            relay.disconnect(cancel).await?;
            self.with_entry(relay.url(), |entry| entry.attach(&self.observers));
            relay.connect(cancel).await
        })
        .await;
        failures(results)
    }

    fn with_entry(&self, url: &Url, f: impl FnOnce(&mut Entry)) {
        if let Some(mut entry) = self.relays.get_mut(url) {
            f(&mut entry);
        }
    }

    fn all(&self) -> Vec<Relay> {
        self.relays
            .iter()
            .map(|entry| entry.relay.clone())
            .collect()
    }

    /// every relay, or just `target`; map guards never outlive this call
    fn select(&self, target: Option<&str>) -> Result<Vec<Relay>, PoolError> {
        let Some(target) = target else {
            return Ok(self.all());
        };
        let url = normalize_url(target)?;
        match self.relays.get(&url) {
            Some(entry) => Ok(vec![entry.relay.clone()]),
            None => Err(PoolError::UnknownRelay(url)),
        }
    }

    /// a broadcast only reaches connected relays, an explicit target is always tried
    fn select_connected(&self, target: Option<&str>) -> Result<Vec<Relay>, PoolError> {
        let relays = self.select(target)?;
        if target.is_some() {
            return Ok(relays);
        }
        Ok(relays
            .into_iter()
            .filter(|relay| relay.is_connected())
            .collect())
    }
}

async fn fan_out<T, F, Fut>(relays: Vec<Relay>, op: F) -> Vec<(Url, Result<T, RelayError>)>
where
    F: Fn(Relay) -> Fut,
    Fut: Future<Output = Result<T, RelayError>>,
{
    join_all(relays.into_iter().map(|relay| {
        let url = relay.url().clone();
        let fut = op(relay);
        async move { (url, fut.await) }
    }))
    .await
}

fn failures<T>(results: Vec<(Url, Result<T, RelayError>)>) -> Vec<RelayFailure> {
    results
        .into_iter()
        .filter_map(|(relay_url, result)| {
            result.err().map(|error| {
                if !error.is_cancelled() {
                    log::warn!("[{}] {}", relay_url, error);
                }
                RelayFailure { relay_url, error }
            })
        })
        .collect()
}

fn subscription_outcome(results: Vec<(Url, Result<String, RelayError>)>) -> SubscriptionOutcome {
    let mut outcome = SubscriptionOutcome::default();
    for (relay_url, result) in results {
        match result {
            Ok(subscription_id) => {
                outcome.subscription_ids.insert(relay_url, subscription_id);
            }
            Err(error) => outcome.failures.push(RelayFailure { relay_url, error }),
        }
    }
    outcome
}

fn into_single(mut failures: Vec<RelayFailure>) -> Result<(), PoolError> {
    match failures.pop() {
        Some(failure) => Err(PoolError::Relay(failure)),
        None => Ok(()),
    }
}
