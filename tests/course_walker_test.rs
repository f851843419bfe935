mod common;

use std::sync::Arc;

use serde_json::json;

use common::*;
use lms_autopilot::models::SlideType;
use lms_autopilot::orchestrator::{CourseWalker, WalkReport};
use lms_autopilot::services::FileAnswerCache;

const SET_COMPLETED: &str = "/slides/slide/set_completed";
const QUIZ_GET: &str = "/slides/slide/quiz/get";

#[tokio::test]
async fn test_walk_continues_after_failing_slide() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let session = Arc::new(
        FakeSession::new()
            .reply(SET_COMPLETED, rpc_ok(json!({"channel_completion": 0})))
            .reply(QUIZ_GET, quiz(&[(1, &[10])], true)),
    );
    let llm = Arc::new(ScriptedLlm::new(vec![]));
    let cache = Arc::new(FileAnswerCache::new(dir.path()));
    let walker = CourseWalker::new(flow(&session, &llm, &cache, &config), &config);

    let slides = vec![
        slide("1", SlideType::Video, 0),
        slide("2", SlideType::Text, 0),
        slide("3", SlideType::Quiz, 0),
        slide("4", SlideType::Video, 1),
    ];
    let report = walker.walk(&slides).await;

    assert_eq!(
        report,
        WalkReport {
            pending: 0,
            completed: 2,
            skipped: 0,
            failed: 2,
            total: 4,
        }
    );
    // 视频失败按 max_retry 重试；完成的课件不发请求
    assert_eq!(
        session.calls_to(SET_COMPLETED).len(),
        config.max_retry as usize + 1
    );
}

#[tokio::test(start_paused = true)]
async fn test_walk_waits_between_slides() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.delay_between_slide_ms = 5000;
    let session = Arc::new(FakeSession::new());
    let llm = Arc::new(ScriptedLlm::new(vec![]));
    let cache = Arc::new(FileAnswerCache::new(dir.path()));
    let walker = CourseWalker::new(flow(&session, &llm, &cache, &config), &config);

    let started = tokio::time::Instant::now();
    let report = walker
        .walk(&[slide("1", SlideType::Video, 1), slide("2", SlideType::Quiz, 1)])
        .await;

    assert_eq!(report.completed, 2);
    assert!(started.elapsed() >= std::time::Duration::from_millis(10_000));
    assert_eq!(session.call_count(), 0);
}
