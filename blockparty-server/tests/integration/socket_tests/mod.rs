mod test_full_relay_cycle;
