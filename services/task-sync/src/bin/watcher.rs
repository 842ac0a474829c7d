/// TaskV2 → Task 同期 watcher
///
/// マネージドトリガーを使わずに、ソースコレクションのChange Streamを直接購読して
/// 1イベントずつハンドラーを呼び出す常駐プロセス。イベントは受信順に逐次処理する。
///
/// # 環境変数
/// - MONGODB_URI: 接続URI（必須）
/// - MONGODB_DATABASE / SOURCE_COLLECTION / TARGET_COLLECTION: コマンドライン引数で上書き可能
///
/// # ローカル実行
/// ```bash
/// export MONGODB_URI=mongodb://localhost:27017/?replicaSet=rs0
///
/// cargo run --bin watcher
///
/// # コレクション名指定
/// cargo run --bin watcher -- --database ExampleDB --source TaskV2 --target Task
/// ```
use clap::Parser;
use lambda_runtime::Error;
use task_sync::application::ChangeEventHandler;
use task_sync::infrastructure::{
    MongoConfig, MongoTaskDatabase, SourceChangeStream, StreamItem, init_logging,
};
use tracing::{error, info, warn};

/// コマンドライン引数
#[derive(Parser, Debug)]
#[command(name = "watcher")]
#[command(about = "TaskV2のChange Streamを購読してTaskへ同期")]
struct CliArgs {
    /// データベース名（MONGODB_DATABASEより優先）
    #[arg(long, short = 'd')]
    database: Option<String>,

    /// ソースコレクション名（SOURCE_COLLECTIONより優先）
    #[arg(long, short = 's')]
    source: Option<String>,

    /// ターゲットコレクション名（TARGET_COLLECTIONより優先）
    #[arg(long, short = 't')]
    target: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    let args = CliArgs::parse();
    let config = MongoConfig::from_env()?.with_overrides(args.database, args.source, args.target);
    let collections = config.collections().clone();

    let database = MongoTaskDatabase::connect(&config).await?;
    let mut stream = SourceChangeStream::open(&database, &collections.source).await?;
    let handler = ChangeEventHandler::new(database, collections.clone());

    info!(
        database = %collections.database,
        source = %collections.source,
        target = %collections.target,
        "Change Stream購読開始"
    );

    let mut handled_count: u64 = 0;
    let mut skipped_count: u64 = 0;

    while let Some(item) = stream.next_item().await? {
        match item {
            StreamItem::Event(change_event) => {
                if let Err(err) = handler.handle(&change_event).await {
                    error!(
                        error = %err,
                        source_id = %change_event.source_id(),
                        "Change Event処理に失敗、終了します"
                    );
                    return Err(err.into());
                }
                handled_count += 1;
            }
            StreamItem::Skipped(reason) => {
                warn!(reason = %reason, "Change Eventをスキップ");
                skipped_count += 1;
            }
        }
    }

    info!(
        handled_count = handled_count,
        skipped_count = skipped_count,
        "Change Streamが終了"
    );

    Ok(())
}
