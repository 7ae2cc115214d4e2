use blockparty_core::GameState;
use tokio::sync::oneshot;

pub(crate) enum SessionCommand {
    SendState(GameState),
    Disconnect { done: oneshot::Sender<()> },
}
