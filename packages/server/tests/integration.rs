mod integration {
    mod common;

    mod e2e;
    mod queue_dispatch;
    mod stats;
    mod webhook;
}
