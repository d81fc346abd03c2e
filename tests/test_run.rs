mod memory_stream;

use crate::memory_stream::MemoryStreamFactory;
use docbase_engine::bson;
use docbase_engine::engine::{BsonAutoId, LiteEngine, LiteSettings, Order};
use std::sync::{Arc, Mutex};

fn open_database() -> LiteEngine {
    let main = MemoryStreamFactory::absent();
    let log = MemoryStreamFactory::absent();

    let settings = LiteSettings {
        data_stream: Box::new(main),
        log_stream: Box::new(log),
        temp_stream: Box::new(MemoryStreamFactory::absent()),
        auto_build: false,
        collation: None,
        password: None,
    };

    LiteEngine::new(settings).unwrap()
}

#[test]
fn run_test() {
    let engine = open_database();

    assert!(engine.get_collection_names().is_empty());
    assert!(!engine.drop_collection("unityVersions").unwrap());

    engine
        .ensure_index("unityVersions", "path", "$.Path", false)
        .unwrap();
    engine
        .ensure_index("unityVersions", "version", "$.Version", false)
        .unwrap();

    assert!(engine.drop_index("unityVersions", "path").unwrap());

    let inserted = engine
        .insert(
            "unityVersions",
            vec![{
                let mut doc = bson::Document::new();
                doc.insert(
                    "Path".into(),
                    "/Applications/Unity/Hub/Editor/2022.3.49f1/Unity.app/Contents/MacOS/Unity".into(),
                );
                doc.insert("Version".into(), "2022.3.49f1".into());
                doc.insert("LoadedFromHub".into(), false.into());
                doc
            }],
            BsonAutoId::ObjectId,
        )
        .unwrap();
    assert_eq!(inserted, 1);

    let all = engine.get_all("unityVersions").unwrap();
    assert_eq!(all.len(), 1);
    let id = all[0].try_get("_id").unwrap().clone();

    let updated = engine
        .update("unityVersions", {
            let mut doc = bson::Document::new();
            doc.insert("_id".into(), id.clone());
            doc.insert(
                "Path".into(),
                "/Applications/Unity/Hub/Editor/2022.3.6f1/Unity.app/Contents/MacOS/Unity".into(),
            );
            doc.insert("Version".into(), "2022.3.6f1".into());
            doc.insert("LoadedFromHub".into(), false.into());
            vec![doc]
        })
        .unwrap();
    assert_eq!(updated, 1);

    let (inserted, _) = {
        let mut new_doc = bson::Document::new();
        new_doc.insert(
            "Path".into(),
            "/Applications/Unity/Hub/Editor/6000.0.0b12/Unity.app/Contents/MacOS/Unity".into(),
        );
        new_doc.insert("Version".into(), "6000.0.0b12".into());
        new_doc.insert("LoadedFromHub".into(), false.into());

        let mut existing = bson::Document::new();
        existing.insert("_id".into(), id.clone());
        existing.insert("Path".into(), "unchanged".into());
        existing.insert("Version".into(), "2022.3.6f1".into());
        existing.insert("LoadedFromHub".into(), true.into());

        let count = engine
            .upsert("unityVersions", vec![new_doc, existing], BsonAutoId::ObjectId)
            .unwrap();
        (count, ())
    };
    assert_eq!(inserted, 2);

    let by_version = engine
        .get_by_index("unityVersions", "version", &"2022.3.6f1".into())
        .unwrap();
    assert_eq!(by_version.len(), 1);
    assert_eq!(by_version[0].try_get("Path").unwrap(), &bson::Value::from("unchanged"));

    let ranged = engine
        .get_range_indexed(
            "unityVersions",
            "version",
            &"2022".into(),
            &"2023".into(),
            Order::Descending,
        )
        .unwrap();
    assert_eq!(ranged.len(), 1);

    let deleted = engine.delete("unityVersions", &[id]).unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(engine.get_all("unityVersions").unwrap().len(), 2);

    engine.checkpoint().unwrap();
    assert!(engine.drop_collection("unityVersions").unwrap());
}

#[test]
fn with_transaction_joins_a_single_transaction() {
    let engine = open_database();

    let data = Arc::new(Mutex::new(Vec::<bson::Value>::new()));

    engine
        .with_transaction(|engine| {
            engine.insert(
                "widgets",
                vec![{
                    let mut doc = bson::Document::new();
                    doc.insert("name".into(), "first".into());
                    doc
                }],
                BsonAutoId::ObjectId,
            )?;
            engine.insert(
                "widgets",
                vec![{
                    let mut doc = bson::Document::new();
                    doc.insert("name".into(), "second".into());
                    doc
                }],
                BsonAutoId::ObjectId,
            )?;
            Ok(())
        })
        .unwrap();

    for doc in engine.get_all("widgets").unwrap() {
        data.lock().unwrap().push(doc.try_get("name").unwrap().clone());
    }
    assert_eq!(data.lock().unwrap().len(), 2);
}
