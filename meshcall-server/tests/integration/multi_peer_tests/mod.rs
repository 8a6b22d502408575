mod test_multiple_peers_join;
mod test_three_peers_join;
