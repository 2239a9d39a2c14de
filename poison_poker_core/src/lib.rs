//! # Poison Poker 客户端核心库
//!
//! 这个 `core` crate 包含了客户端的全部逻辑：牌力评估、服务器状态的本地镜像、
//! 把界面点击翻译成合法动作的解析器，以及驱动整局游戏的同步引擎。
//! 游戏规则本身由服务器裁决，这里只负责镜像、提交和展示结论。
//! 它与具体的传输方式和界面解耦，通过 [`GameApi`] 和 [`Renderer`] 两个边界接入上层应用。

mod api;
mod card;
mod error;
mod lobby;
mod message;
mod resolve;
mod scene;
mod state;
mod sync;

#[cfg(test)]
mod testing;

pub use api::*;

pub use card::*;

pub use error::*;

pub use lobby::*;

pub use message::*;

pub use resolve::*;

pub use scene::*;

pub use state::*;

pub use sync::*;
