use chrono::{Duration, Local, NaiveDate};

use daybook::core::temporal::{Bucket, BucketedEvents};
use daybook::import::{ImportResult, Importer};
use daybook::store::{EventStore, JsonFileStorage};

#[tokio::test]
async fn import_then_bucket_from_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("data/events.json");

    let today = Local::now().date_naive();
    let tomorrow = today + Duration::days(1);
    let csv = format!(
        "事件名称,开始时间,结束时间,所属项目,重复设置\n\
         Write report,{today} 09:00,{today} 11:00,Q3,\n\
         Gym,{tomorrow} 18:00,{tomorrow} 19:00,,\"daily,,3\"\n"
    );
    let csv_path = dir.path().join("plan.csv");
    std::fs::write(&csv_path, csv).unwrap();

    let ics_path = dir.path().join("cal.ics");
    std::fs::write(
        &ics_path,
        "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nSUMMARY:Old meeting\r\nDTSTART:20200101T100000\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n",
    )
    .unwrap();

    {
        let mut store = EventStore::open(JsonFileStorage::new(&store_path)).unwrap();
        let mut importer = Importer::new(&mut store);
        assert_eq!(
            importer.handle_file_import(&csv_path).await,
            ImportResult::Success { count: 4 }
        );
        assert_eq!(
            importer.handle_file_import(&ics_path).await,
            ImportResult::Success { count: 1 }
        );
    }

    let mut store = EventStore::open(JsonFileStorage::new(&store_path)).unwrap();
    assert_eq!(store.get_events().len(), 5);
    assert_eq!(store.get_data().projects.len(), 1);

    let report_id = store
        .get_events()
        .iter()
        .find(|e| e.name == "Write report")
        .unwrap()
        .id
        .clone();
    store.mark_event_completed(&report_id, true).unwrap();

    let now = today.and_hms_opt(12, 0, 0).unwrap();
    let view = BucketedEvents::build(store.get_events(), now);
    assert_eq!(view.total_count(), 5);
    assert_eq!(view.get(Bucket::Today).len(), 1);
    assert!(view.get(Bucket::Today)[0].completed);
    assert_eq!(view.get(Bucket::Tomorrow).len(), 1);
    assert_eq!(view.get(Bucket::DayAfterTomorrow).len(), 1);
    assert_eq!(view.get(Bucket::NearFuture).len(), 1);
    assert_eq!(view.get(Bucket::Past)[0].name, "Old meeting");
    assert_eq!(
        view.get(Bucket::Past)[0].start_time.unwrap().date(),
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
    );
}
