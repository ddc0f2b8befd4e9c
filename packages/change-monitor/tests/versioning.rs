//! Version chain properties over many successive content changes.

use proptest::prelude::*;

use change_monitor::testing::{MockExtractor, MockFetcher};
use change_monitor::{
    MemoryRepository, MonitorConfig, RecordStatus, RunCoordinator, SourceDefinition,
};

const SOURCE: &str = "Events";
const URL: &str = "https://events.example.org/e/1";

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_versions_form_a_gapless_chain(titles in prop::collection::vec("[a-z]{1,8}", 1..8)) {
        let fetcher = MockFetcher::new().with_listing(SOURCE, &[URL]);
        let coordinator = RunCoordinator::new(
            MemoryRepository::new(),
            fetcher.clone(),
            MonitorConfig::new().with_max_items(-1),
        )
        .with_extractor(MockExtractor::new());
        let source = SourceDefinition::fixed(SOURCE, vec![URL.to_string()]);

        let mut distinct = 0;
        let mut last: Option<String> = None;
        for title in &titles {
            fetcher.set_page(URL, title.clone());
            tokio_test::block_on(coordinator.run(std::slice::from_ref(&source))).unwrap();
            if last.as_deref() != Some(title.as_str()) {
                distinct += 1;
            }
            last = Some(title.clone());
        }

        let repo = coordinator.repository();
        let records = repo.records();
        prop_assert_eq!(records.len(), distinct);

        for (i, record) in records.iter().enumerate() {
            prop_assert_eq!(record.version as usize, i + 1);
            prop_assert_eq!(record.status, RecordStatus::Draft);
            match i {
                0 => prop_assert!(record.previous_version_id.is_none()),
                _ => prop_assert_eq!(record.previous_version_id.as_ref(), Some(&records[i - 1].id)),
            }
        }

        let doc = repo.document_by_url(URL).unwrap();
        prop_assert_eq!(doc.record_id.as_ref(), records.last().map(|r| &r.id));
        prop_assert_eq!(doc.check_count as usize, titles.len());
    }
}
