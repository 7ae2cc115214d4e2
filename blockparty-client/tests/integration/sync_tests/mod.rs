mod test_broadcast_guard;
mod test_direct_channel;
