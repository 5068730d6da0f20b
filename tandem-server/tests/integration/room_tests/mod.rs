mod test_concurrent_joins;
mod test_room_capacity;
