mod test_connect_failures;
