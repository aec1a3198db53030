//! The subdomain registry: the single process-wide map from subdomain
//! identifier to connected client.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::RwLock;

use crate::client::ClientHandle;

const SUBDOMAIN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUBDOMAIN_LEN: usize = 6;

/// `Arc<RwLock<HashMap<...>>>` keyed by subdomain. Held only across
/// insert/remove/lookup; callers clone the `Arc<ClientHandle>` out and
/// release the lock before doing anything that awaits.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<RwLock<HashMap<String, Arc<ClientHandle>>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly accepted client under a newly synthesized
    /// subdomain identifier and return that identifier.
    pub async fn insert(&self, client: Arc<ClientHandle>) -> String {
        let subdomain = client.subdomain.clone();
        self.clients.write().await.insert(subdomain.clone(), client);
        subdomain
    }

    pub async fn get(&self, subdomain: &str) -> Option<Arc<ClientHandle>> {
        self.clients.read().await.get(subdomain).cloned()
    }

    /// Remove a client's registry entry. Idempotent: removing an absent
    /// subdomain is a no-op (the client may already have been torn down
    /// by a concurrent caller).
    pub async fn remove(&self, subdomain: &str) {
        self.clients.write().await.remove(subdomain);
    }
}

/// Generate a fresh, lowercase alphanumeric subdomain identifier, e.g.
/// `"abc123"`. Not checked against the registry for collisions: the
/// identifier space (36^6) is large relative to any single gateway's
/// concurrent client count, matching the reference implementation's
/// "just mint one" behaviour (see Open Question (b) in DESIGN.md).
pub fn generate_subdomain() -> String {
    let mut rng = rand::thread_rng();
    (0..SUBDOMAIN_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..SUBDOMAIN_ALPHABET.len());
            SUBDOMAIN_ALPHABET[idx] as char
        })
        .collect()
}
