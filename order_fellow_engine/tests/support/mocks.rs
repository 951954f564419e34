use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use mockall::mock;
use order_fellow_engine::notifications::{EmailError, EmailMessage, EmailSender};

mock! {
    pub Mailer {}
    impl EmailSender for Mailer {
        fn send_email(&self, message: EmailMessage) -> BoxFuture<'static, Result<(), EmailError>>;
    }
}

/// A mock mailer that accepts every message and keeps a copy of it.
pub fn accepting_mailer() -> (MockMailer, Arc<Mutex<Vec<EmailMessage>>>) {
    let outbox = Arc::new(Mutex::new(Vec::new()));
    let sent = Arc::clone(&outbox);
    let mut mailer = MockMailer::new();
    mailer.expect_send_email().returning(move |message| {
        sent.lock().unwrap().push(message);
        Box::pin(async { Ok(()) })
    });
    (mailer, outbox)
}
