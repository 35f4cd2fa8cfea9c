// src/load_balancer/source_ip_hash.rs
use super::algorithm::{eligible, SelectionPolicy};
use super::context::RequestContext;
use crate::error::Result;
use crate::pool::Server;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over the UTF-8 bytes of `key`. Stable across processes.
pub fn fnv1a64(key: &str) -> u64 {
    key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Maps each client key to a fixed healthy server.
///
/// Healthy servers are sorted by id before indexing, so the mapping does not
/// depend on snapshot order. Changing the number of healthy servers remaps
/// some keys; there is no consistent-hashing guarantee.
#[derive(Debug, Default)]
pub struct SourceIpHash;

impl SourceIpHash {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionPolicy for SourceIpHash {
    fn select<'a>(&self, snapshot: &'a [Server], context: &RequestContext) -> Result<&'a Server> {
        let mut servers = eligible(snapshot)?;
        servers.sort_by(|a, b| a.id.cmp(&b.id));

        let index = fnv1a64(context.client_key()) % servers.len() as u64;
        Ok(servers[index as usize])
    }

    fn name(&self) -> &'static str {
        "source_ip_hash"
    }
}
