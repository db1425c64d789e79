//! Optional Redis tier for the cache.
//!
//! Uses the synchronous client with `SETEX`/`GET`/`DEL`. Keys are namespaced
//! so several deployments can share an instance.

use std::sync::Mutex;

use redis::Commands;

use crate::cache::CacheError;

const KEY_PREFIX: &str = "mallpoints:cache:";

pub struct RedisTier {
    conn: Mutex<redis::Connection>,
}

impl RedisTier {
    /// Connect to a Redis instance, e.g. `redis://127.0.0.1/`.
    pub fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url).map_err(CacheError::Redis)?;
        let conn = client.get_connection().map_err(CacheError::Redis)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn namespaced(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    pub fn put(&self, key: &str, bytes: &[u8], ttl_secs: u64) -> Result<(), CacheError> {
        let mut conn = self.conn.lock().expect("redis lock poisoned");
        conn.set_ex::<_, _, ()>(Self::namespaced(key), bytes, ttl_secs)
            .map_err(CacheError::Redis)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.conn.lock().expect("redis lock poisoned");
        let value: Option<Vec<u8>> = conn.get(Self::namespaced(key)).map_err(CacheError::Redis)?;
        Ok(value)
    }

    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.lock().expect("redis lock poisoned");
        conn.del::<_, ()>(Self::namespaced(key)).map_err(CacheError::Redis)?;
        Ok(())
    }
}
