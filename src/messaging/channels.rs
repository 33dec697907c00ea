// Communication channels lock-free

use crate::messaging::command::ClickCommand;
use crate::messaging::notification::MetronomeEvent;
use ringbuf::{HeapRb, traits::Split};

/// Tick thread → audio callback
pub type ClickProducer = ringbuf::HeapProd<ClickCommand>;
pub type ClickConsumer = ringbuf::HeapCons<ClickCommand>;

pub fn create_click_channel(capacity: usize) -> (ClickProducer, ClickConsumer) {
    let rb = HeapRb::<ClickCommand>::new(capacity);
    rb.split()
}

/// Tick thread → host
pub type EventProducer = ringbuf::HeapProd<MetronomeEvent>;
pub type EventConsumer = ringbuf::HeapCons<MetronomeEvent>;

pub fn create_event_channel(capacity: usize) -> (EventProducer, EventConsumer) {
    let rb = HeapRb::<MetronomeEvent>::new(capacity);
    rb.split()
}
