// Messaging - Lock-free channels between the tick thread, the audio callback and the host

pub mod channels;
pub mod command;
pub mod notification;

pub use channels::{
    ClickConsumer, ClickProducer, EventConsumer, EventProducer, create_click_channel,
    create_event_channel,
};
pub use command::ClickCommand;
pub use notification::MetronomeEvent;
