#[cfg(test)]
mod persistence_tests {
    use crate::client::outbound::{OutboundMessage, OutboundQueue};
    use crate::persistence::{OutboundStore, StoredMessage};

    use serde_json::json;
    use tempfile::tempdir;

    fn message(channel: &str, n: i64) -> OutboundMessage {
        OutboundMessage::new(channel, json!({ "n": n }))
    }

    #[test]
    fn test_append_and_load_in_order() {
        let dir = tempdir().unwrap();
        let store = OutboundStore::open(dir.path()).unwrap();

        for n in 0..5 {
            store.append(&message("chan", n)).unwrap();
        }

        let loaded = store.load_all().unwrap();
        let ns: Vec<_> = loaded.iter().map(|m| m.data["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![0, 1, 2, 3, 4]);
        assert_eq!(store.len(), 5);
    }

    #[test]
    fn test_remove_first_drops_oldest() {
        let dir = tempdir().unwrap();
        let store = OutboundStore::open(dir.path()).unwrap();
        for n in 0..4 {
            store.append(&message("chan", n)).unwrap();
        }

        store.remove_first(3).unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded, vec![message("chan", 3)]);
    }

    #[test]
    fn test_clear_and_replace_all() {
        let dir = tempdir().unwrap();
        let store = OutboundStore::open(dir.path()).unwrap();
        store.append(&message("a", 1)).unwrap();
        store.clear().unwrap();
        assert!(store.is_empty());

        let replacement = vec![message("b", 2), message("c", 3)];
        store.replace_all(replacement.iter()).unwrap();
        assert_eq!(store.load_all().unwrap(), replacement);
    }

    #[test]
    fn test_store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = OutboundStore::open(dir.path()).unwrap();
            store.append(&message("offline", 1)).unwrap();
            store.append(&message("offline", 2)).unwrap();
        }

        let reopened = OutboundStore::open(dir.path()).unwrap();
        let loaded = reopened.load_all().unwrap();
        assert_eq!(loaded, vec![message("offline", 1), message("offline", 2)]);

        // ids keep increasing after a reopen
        reopened.append(&message("offline", 3)).unwrap();
        let loaded = reopened.load_all().unwrap();
        assert_eq!(loaded.last(), Some(&message("offline", 3)));
    }

    #[test]
    fn test_queue_with_store_reloads_and_drains() {
        let dir = tempdir().unwrap();
        {
            let store = OutboundStore::open(dir.path()).unwrap();
            let mut queue = OutboundQueue::with_store(store, None).unwrap();
            queue.enqueue("chan", json!({"msg": "a"}));
            queue.enqueue("chan", json!({"msg": "b"}));
        }

        let store = OutboundStore::open(dir.path()).unwrap();
        let mut queue = OutboundQueue::with_store(store.clone(), None).unwrap();
        assert_eq!(queue.len(), 2);

        let drained = queue.drain_all();
        assert_eq!(drained[0].data, json!({"msg": "a"}));
        assert_eq!(drained[1].data, json!({"msg": "b"}));
        assert_eq!(store.len(), 2);

        queue.commit();
        assert!(store.is_empty());

        queue.requeue_front(drained[1..].to_vec());
        assert_eq!(store.load_all().unwrap(), vec![OutboundMessage::new("chan", json!({"msg": "b"}))]);
    }

    #[test]
    fn test_drained_entries_survive_restart_until_commit() {
        let dir = tempdir().unwrap();
        {
            let store = OutboundStore::open(dir.path()).unwrap();
            let mut queue = OutboundQueue::with_store(store, None).unwrap();
            queue.enqueue("chan", json!({"n": 0}));
            queue.enqueue("chan", json!({"n": 1}));
            // dropped mid-replay: drained but never committed
            assert_eq!(queue.drain_all().len(), 2);
        }

        let store = OutboundStore::open(dir.path()).unwrap();
        let queue = OutboundQueue::with_store(store.clone(), None).unwrap();
        let reloaded: Vec<_> = queue.iter().cloned().collect();
        assert_eq!(reloaded, vec![message("chan", 0), message("chan", 1)]);
    }

    #[test]
    fn test_queue_limit_trims_persisted_entries() {
        let dir = tempdir().unwrap();
        let store = OutboundStore::open(dir.path()).unwrap();
        let mut queue = OutboundQueue::with_store(store.clone(), Some(2)).unwrap();

        for n in 0..4 {
            queue.enqueue("chan", json!({ "n": n }));
        }

        assert_eq!(queue.len(), 2);
        let persisted = store.load_all().unwrap();
        assert_eq!(persisted, vec![message("chan", 2), message("chan", 3)]);
    }

    #[test]
    fn test_stored_message_serialization_roundtrip() {
        let msg = StoredMessage {
            channel: "roundtrip".into(),
            data: json!({"key": 42}),
            queued_at: 1725000000,
        };

        let data = serde_json::to_vec(&msg).unwrap();
        let parsed: StoredMessage = serde_json::from_slice(&data).unwrap();

        assert_eq!(msg.channel, parsed.channel);
        assert_eq!(msg.data, parsed.data);
        assert_eq!(msg.queued_at, parsed.queued_at);
    }
}
