mod test_copy;
mod test_mongo;
mod test_partition;
