mod config;
mod render;
mod transport;

use anyhow::Context;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::ClientConfig;
use poison_poker_core::{
    create_session, join_session, GameApi, GameId, Input, ObjectRef, Session, Side, SyncEngine, Termination,
};
use render::TerminalRenderer;
use transport::WsApi;

type StdinLines = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 日志写到 stderr，不和游戏画面混在一起
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env().context("读取客户端配置失败")?;
    info!("服务器地址: {}", config.server_url);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    print_menu_help();

    loop {
        prompt()?;
        let Some(line) = stdin.next_line().await? else {
            break;
        };
        let parts: Vec<&str> = line.split_whitespace().collect();

        let join_target = match parts.first().copied() {
            Some("create") => None,
            Some("join") => match parts.get(1).map(|raw| raw.parse::<GameId>()) {
                Some(Ok(game_id)) => Some(game_id),
                Some(Err(_)) => {
                    println!("无效的游戏ID格式");
                    continue;
                }
                None => {
                    println!("用法: join <游戏ID>");
                    continue;
                }
            },
            Some("help") => {
                print_menu_help();
                continue;
            }
            Some("exit") => {
                println!("再见!");
                break;
            }
            Some(_) => {
                println!("未知命令: {}", line.trim());
                continue;
            }
            None => continue,
        };

        // 每局游戏使用一条新的连接，对局结束后随 api 一起关闭
        let api = match WsApi::connect(&config.server_url).await {
            Ok(api) => Arc::new(api),
            Err(e) => {
                println!("无法连接到服务器: {}", e);
                continue;
            }
        };

        let session = match join_target {
            None => create_session(&*api).await,
            Some(game_id) => join_session(&*api, game_id, config.join_retry).await,
        };
        let session = match session {
            Ok(session) => session,
            Err(e) => {
                warn!("进入游戏失败: {}", e);
                println!("无法进入游戏: {}", e);
                continue;
            }
        };

        match play(api, session, &mut stdin).await {
            Ok(end) => println!("{}", describe_termination(&end)),
            Err(e) => println!("对局异常结束: {:#}", e),
        }
        print_menu_help();
    }

    Ok(())
}

/// 进行一局游戏直到结束，期间标准输入的每一行都被翻译成对引擎的输入
async fn play(api: Arc<WsApi>, session: Session, stdin: &mut StdinLines) -> anyhow::Result<Termination> {
    println!("游戏 ID: {} (把它发给对手，用 join 命令加入)", session.game_id);
    let events = api.subscribe_events(session.player_id).await.context("订阅事件推送失败")?;

    let renderer = TerminalRenderer::new(session.player_id);
    let (engine, handle) = SyncEngine::new(Arc::clone(&api), renderer, session.player_id, session.game_id);
    let (inputs_tx, inputs) = mpsc::channel::<Input>(16);
    print_game_help();

    let run = engine.run(events, inputs);
    tokio::pin!(run);
    let mut stdin_open = true;

    loop {
        tokio::select! {
            end = &mut run => return Ok(end),
            line = stdin.next_line(), if stdin_open => match line? {
                // 标准输入关闭，视为离开对局
                None => {
                    stdin_open = false;
                    handle.teardown();
                }
                Some(line) => match parse_game_command(&line) {
                    GameCommand::Input(input) => {
                        if inputs_tx.send(input).await.is_err() {
                            handle.teardown();
                        }
                    }
                    GameCommand::Leave => {
                        println!("正在离开游戏...");
                        handle.teardown();
                    }
                    GameCommand::Help => print_game_help(),
                    GameCommand::Empty => {}
                    GameCommand::Unknown => println!("未知命令: {}", line.trim()),
                },
            },
        }
    }
}

/// 对局中的一行输入
#[derive(Debug, PartialEq, Eq)]
enum GameCommand {
    Input(Input),
    Leave,
    Help,
    Empty,
    Unknown,
}

fn parse_game_command(line: &str) -> GameCommand {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [] => GameCommand::Empty,
        ["poison"] => GameCommand::Input(Input::ToggleProtectMode),
        ["poison", "on"] => GameCommand::Input(Input::SetProtectMode(true)),
        ["poison", "off"] => GameCommand::Input(Input::SetProtectMode(false)),
        ["leave"] | ["exit"] => GameCommand::Leave,
        ["help"] => GameCommand::Help,
        [n] | ["click", n] => match n.parse::<u32>() {
            Ok(n) => GameCommand::Input(Input::Gesture(ObjectRef(n))),
            Err(_) => GameCommand::Unknown,
        },
        _ => GameCommand::Unknown,
    }
}

fn describe_termination(end: &Termination) -> String {
    match end {
        Termination::Abandoned(reason) => format!("对局已中断: {}", reason),
        Termination::Showdown(message) => format!("对局结束: {}", message),
        Termination::Eliminated(Side::Me) => "对局结束: 你被淘汰了".to_string(),
        Termination::Eliminated(Side::Opponent) => "对局结束: 对手被淘汰了".to_string(),
        Termination::TornDown => "已离开对局".to_string(),
    }
}

fn prompt() -> std::io::Result<()> {
    print!("> ");
    std::io::stdout().flush()
}

fn print_menu_help() {
    println!("--- Poison Poker 客户端 ---");
    println!("可用命令:");
    println!("  create                    - 创建一局新游戏");
    println!("  join <游戏ID>             - 加入一局游戏");
    println!("  help                      - 显示帮助");
    println!("  exit                      - 退出");
}

fn print_game_help() {
    println!("对局中的命令:");
    println!("  <编号> | click <编号>     - 点击画面上带编号的对象 (带 * 的可以操作)");
    println!("  poison [on|off]           - 切换下毒 (保护) 模式");
    println!("  leave                     - 离开对局，回到主菜单");
}
