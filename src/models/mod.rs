pub mod quiz;
pub mod rpc;
pub mod session;
pub mod slide;

pub use quiz::{
    AnswerOption, AnswerRecord, QuizContent, QuizQuestion, QuizSubmitResult, SubmitOutcome,
    VideoCompletion,
};
pub use rpc::{decode_reply, RpcReply, RpcRequest};
pub use session::{Cookie, Session};
pub use slide::{Slide, SlideType};
