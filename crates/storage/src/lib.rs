// Redis storage layer
//
// This crate provides the Redis implementation of the core list traits:
// - RedisListStore: implements ListStore over Redis lists
// - RedisConnector: implements ListStoreConnector for redis:// and rediss:// URLs

pub mod redis_store;

pub use redis_store::{
    create_redis_message_log, redis_message_log_from_env, RedisConnector, RedisListStore,
};
