// Unit tests for domain models

#[cfg(test)]
mod tests {
    use crate::domain::errors::*;
    use crate::domain::model::*;

    #[test]
    fn test_file_item_starts_waiting() {
        let item = FileItem::new("/videos/clip.mp4");
        assert_eq!(item.status, FileStatus::Waiting);
        assert_eq!(item.progress, 0);
        assert_eq!(item.file_name(), "clip.mp4");
        assert!(!item.is_terminal());
    }

    #[test]
    fn test_file_item_processing_resets_progress() {
        let mut item = FileItem::new("a.mov");
        item.mark_processing();
        assert!(item.advance(40));
        item.mark_processing();
        assert_eq!(item.status, FileStatus::Processing);
        assert_eq!(item.progress, 0);
    }

    #[test]
    fn test_file_item_advance_is_monotonic() {
        let mut item = FileItem::new("a.mov");
        item.mark_processing();
        assert!(item.advance(10));
        assert!(item.advance(55));
        assert!(!item.advance(30));
        assert!(!item.advance(55));
        assert_eq!(item.progress, 55);
        assert!(item.advance(250));
        assert_eq!(item.progress, 100);
    }

    #[test]
    fn test_file_item_advance_ignored_unless_processing() {
        let mut item = FileItem::new("a.mov");
        assert!(!item.advance(20));
        assert_eq!(item.progress, 0);
    }

    #[test]
    fn test_file_item_terminal_progress() {
        let mut item = FileItem::new("a.mov");
        item.mark_processing();
        item.advance(70);
        item.mark_done();
        assert_eq!((item.status, item.progress), (FileStatus::Done, 100));

        item.mark_processing();
        item.advance(70);
        item.mark_error();
        assert_eq!((item.status, item.progress), (FileStatus::Error, 0));
        assert!(item.is_terminal());

        item.reset();
        assert_eq!((item.status, item.progress), (FileStatus::Waiting, 0));
    }

    #[test]
    fn test_batch_state_classification() {
        assert!(BatchState::Running.is_active());
        assert!(BatchState::Paused.is_active());
        assert!(!BatchState::FilesLoaded.is_active());
        assert!(BatchState::Done.is_finished());
        assert!(BatchState::Stopped.is_finished());
        assert!(BatchState::Error.is_finished());
        assert!(!BatchState::Idle.is_finished());
    }

    #[test]
    fn test_probe_report_effective_duration() {
        assert_eq!(ProbeReport::unknown().effective_duration(), 1.0);

        let mut report = ProbeReport::unknown();
        report.duration = Some(0.0);
        assert_eq!(report.effective_duration(), 1.0);
        report.duration = Some(f64::NAN);
        assert_eq!(report.effective_duration(), 1.0);
        report.duration = Some(42.5);
        assert_eq!(report.effective_duration(), 42.5);
    }

    #[test]
    fn test_geometry_normalizes_rotation() {
        assert_eq!(VideoGeometry::new(1920, 1080, Some(-90)).rotation, Some(270));
        assert_eq!(VideoGeometry::new(1920, 1080, Some(450)).rotation, Some(90));
        assert_eq!(VideoGeometry::new(1920, 1080, None).rotation, None);
    }

    #[test]
    fn test_geometry_dimensions() {
        assert_eq!(VideoGeometry::new(640, 480, None).dimensions(), Some((640, 480)));
        assert_eq!(VideoGeometry::default().dimensions(), None);
        assert_eq!(VideoGeometry::new(0, 480, None).dimensions(), None);
    }

    #[test]
    fn test_filter_chain_arg() {
        assert_eq!(FilterChain::default().to_arg(), None);

        let chain = FilterChain {
            steps: vec![
                FilterStep::Transpose,
                FilterStep::Scale { width: 1920, height: 1080 },
            ],
        };
        assert_eq!(chain.to_arg().as_deref(), Some("transpose=1,scale=1920:1080"));
    }

    #[test]
    fn test_default_profile_is_valid() {
        let profile = EncodeProfile::default();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.video_codec, "dnxhd");
        assert_eq!(profile.frame_rate, "30000/1001");
    }

    #[test]
    fn test_profile_rejects_zero_dimensions() {
        let profile = EncodeProfile {
            target_height: 0,
            ..EncodeProfile::default()
        };
        assert!(matches!(profile.validate(), Err(DomainError::BadArgs(_))));
    }

    #[test]
    fn test_error_policy_parse() {
        assert_eq!(ErrorPolicy::parse("fail-fast").unwrap(), ErrorPolicy::FailFast);
        assert_eq!(ErrorPolicy::parse(" Continue ").unwrap(), ErrorPolicy::Continue);
        assert!(ErrorPolicy::parse("skip").is_err());
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::FailFast);
    }

    #[test]
    fn test_batch_event_json_shape() {
        let event = BatchEvent::Progress { percent: 42 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "progress");
        assert_eq!(json["percent"], 42);

        let event = BatchEvent::StateChanged { state: BatchState::FilesLoaded };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["state"], "files_loaded");
    }

    #[test]
    fn test_snapshot_count() {
        let mut snapshot = BatchSnapshot::default();
        snapshot.items = vec![FileItem::new("a.mp4"), FileItem::new("b.mp4")];
        snapshot.items[1].mark_done();
        assert_eq!(snapshot.count(FileStatus::Waiting), 1);
        assert_eq!(snapshot.count(FileStatus::Done), 1);
    }
}
