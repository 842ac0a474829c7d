// アプリケーション層モジュール
pub mod change_event_handler;

// 再エクスポート
pub use change_event_handler::{
    ChangeEventHandler, ChangeEventHandlerError, HandleOutcome, HandlerAction,
};
