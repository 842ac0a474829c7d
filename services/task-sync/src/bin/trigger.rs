/// TaskV2 → Task 同期トリガー Lambda関数
///
/// MongoDBのデータベーストリガーがEventBridge経由で転送するChange Eventを受け取り、
/// Taskコレクションへ削除またはマージを1回実行する。
///
/// # 環境変数
/// - MONGODB_URI: 接続URI（必須）
/// - MONGODB_DATABASE: データベース名（デフォルト: ExampleDB）
/// - SOURCE_COLLECTION: ソースコレクション名（デフォルト: TaskV2）
/// - TARGET_COLLECTION: ターゲットコレクション名（デフォルト: Task）
use aws_lambda_events::event::eventbridge::EventBridgeEvent;
use lambda_runtime::{Error, LambdaEvent, service_fn};
use task_sync::application::{ChangeEventHandler, HandleOutcome};
use task_sync::domain::ChangeEvent;
use task_sync::infrastructure::{MongoConfig, MongoTaskDatabase, TaskDatabase, init_logging};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    // コールドスタート時に一度だけ接続し、呼び出し間で共有する
    let config = MongoConfig::from_env().inspect_err(|err| {
        error!(error = %err, "MongoDB設定読み込み失敗");
    })?;
    let database = MongoTaskDatabase::connect(&config).await?;
    let handler = ChangeEventHandler::new(database, config.collections().clone());
    let handler = &handler;

    lambda_runtime::run(service_fn(
        move |event: LambdaEvent<EventBridgeEvent<ChangeEvent>>| async move {
            handle(handler, event).await
        },
    ))
    .await
}

/// Lambda関数のメインハンドラー
///
/// 失敗はそのままLambdaのエラーとして返す（再試行はプラットフォーム側の設定に従う）。
async fn handle<DB: TaskDatabase>(
    handler: &ChangeEventHandler<DB>,
    event: LambdaEvent<EventBridgeEvent<ChangeEvent>>,
) -> Result<HandleOutcome, Error> {
    let change_event = event.payload.detail;

    info!(
        request_id = %event.context.request_id,
        detail_type = %event.payload.detail_type,
        operation_type = change_event.operation_type.as_str(),
        source_id = %change_event.source_id(),
        "Change Eventを受信"
    );

    match handler.handle(&change_event).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            error!(
                error = %err,
                source_id = %change_event.source_id(),
                "Change Event処理に失敗"
            );
            Err(err.into())
        }
    }
}
