use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use prodmatch_core::traits::Notifier;
use prodmatch_core::types::{present, IdentifiedItem};

/// Keep only the digits of a phone-style target, e.g. `+1 (555) 010-9999`.
pub fn sanitize_target(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Human-readable report of what a customer looked for and did not find.
pub fn unmatched_report(items: &[IdentifiedItem], text: Option<&str>) -> String {
    let mut report = String::from("Product search alert: a customer searched for products not found in the store.\n\n");
    if !items.is_empty() {
        report.push_str("Items identified in image:\n");
        for (index, item) in items.iter().enumerate() {
            write_item(&mut report, index + 1, item);
        }
    } else if let Some(text) = text.filter(|t| !t.is_empty()) {
        report.push_str(&format!("Search text: {text}\n"));
    } else {
        report.push_str("Unknown item (no text or products identified)\n");
    }
    report.push_str("\nConsider adding these products to the store inventory.\n");
    report.push_str("This notification was sent automatically because a customer was looking for these products.");
    report
}

fn write_item(report: &mut String, number: usize, item: &IdentifiedItem) {
    let name = present(&item.product_name).unwrap_or("Unknown Item");
    match present(&item.brand) {
        Some(brand) => report.push_str(&format!("{number}. {name} ({brand})\n")),
        None => report.push_str(&format!("{number}. {name}\n")),
    }
    let details = [("Type", &item.kind), ("Color", &item.color), ("Material", &item.material), ("Size", &item.size)];
    for (label, value) in details {
        if let Some(value) = present(value) {
            report.push_str(&format!("   - {label}: {value}\n"));
        }
    }
    if !item.keywords.is_empty() {
        report.push_str(&format!("   - Keywords: {}\n", item.keywords.join(", ")));
    }
    if let Some(description) = present(&item.description) {
        report.push_str(&format!("   - Description: {description}\n"));
    }
    report.push('\n');
}

/// Writes the unmatched report to the log, addressed to the configured
/// target.
#[derive(Debug, Clone)]
pub struct LogNotifier {
    recipient: String,
}

impl LogNotifier {
    pub fn new(target: &str) -> Self {
        Self { recipient: sanitize_target(target) }
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, items: &[IdentifiedItem], text: Option<&str>) -> anyhow::Result<()> {
        if self.recipient.is_empty() {
            anyhow::bail!("notification target has no digits");
        }
        let report = unmatched_report(items, text);
        tracing::info!(recipient = %self.recipient, items = items.len(), %report, "unmatched products notification");
        Ok(())
    }
}

/// Delivers through the wrapped notifier on a detached thread, so `notify`
/// returns immediately. Delivery errors are logged and dropped.
///
/// Short-lived hosts call [`BackgroundNotifier::wait_idle`] before exiting.
pub struct BackgroundNotifier<N> {
    inner: Arc<N>,
    pending: Arc<(Mutex<usize>, Condvar)>,
}

impl<N: Notifier + 'static> BackgroundNotifier<N> {
    pub fn new(inner: N) -> Self {
        Self { inner: Arc::new(inner), pending: Arc::new((Mutex::new(0), Condvar::new())) }
    }

    /// Deliveries started and not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.0.lock().map_or(0, |n| *n)
    }

    /// Block until every started delivery has finished or `timeout` passes.
    /// Returns whether all deliveries finished.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let (count, done) = &*self.pending;
        let Ok(guard) = count.lock() else { return false };
        match done.wait_timeout_while(guard, timeout, |n| *n > 0) {
            Ok((n, _)) => *n == 0,
            Err(_) => false,
        }
    }
}

/// Marks one delivery as finished when dropped, even if it panicked.
struct Delivery(Arc<(Mutex<usize>, Condvar)>);

impl Delivery {
    fn start(pending: &Arc<(Mutex<usize>, Condvar)>) -> Self {
        if let Ok(mut n) = pending.0.lock() {
            *n += 1;
        }
        Self(Arc::clone(pending))
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        let (count, done) = &*self.0;
        if let Ok(mut n) = count.lock() {
            *n = n.saturating_sub(1);
        }
        done.notify_all();
    }
}

impl<N: Notifier + 'static> Notifier for BackgroundNotifier<N> {
    fn notify(&self, items: &[IdentifiedItem], text: Option<&str>) -> anyhow::Result<()> {
        let inner = Arc::clone(&self.inner);
        let items = items.to_vec();
        let text = text.map(str::to_string);
        let delivery = Delivery::start(&self.pending);
        std::thread::Builder::new().name("prodmatch-notify".into()).spawn(move || {
            let _delivery = delivery;
            if let Err(e) = inner.notify(&items, text.as_deref()) {
                tracing::warn!(error = %e, "notification delivery failed");
            }
        })?;
        Ok(())
    }
}
