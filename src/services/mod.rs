pub mod answer_cache;
pub mod course_service;
pub mod llm_service;
pub mod quiz_resolver;

pub use answer_cache::{lookup_answers, AnswerCache, FileAnswerCache};
pub use course_service::{CourseService, SlideLink, VideoReply};
pub use llm_service::{LlmService, TextCompletionService};
pub use quiz_resolver::{AnswerSource, QuizAnswerResolver, QuizOutcome};
