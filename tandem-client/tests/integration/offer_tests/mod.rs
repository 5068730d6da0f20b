mod test_outgoing_call;
