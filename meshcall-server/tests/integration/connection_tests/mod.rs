mod test_heartbeat_evicts_silent_peer;
mod test_join_timeout_notice;
mod test_malformed_message_dropped;
