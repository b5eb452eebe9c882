//! Renderers for the generated text artifacts
//!
//! Both renderers are pure functions over the parsed inventory: no
//! filesystem writes happen here. `authorized_keys` rendering resolves key
//! material and can therefore fail on an unreadable key file; the SSH config
//! renderer is infallible.

use tracing::debug;

use crate::access::is_authorized;
use crate::config::Config;
use crate::keys::KeyRef;
use crate::Result;

/// Comment line labeling the deployment identity in every authorized_keys file
const ROOT_KEY_COMMENT: &str = "# root_key (deployment)";

/// Render the authorized_keys contents for one server.
///
/// People appear in the order the document declares them; each authorized,
/// enabled person contributes a `# <name>` comment followed by their key
/// lines. The deployment identity is appended unconditionally. The result
/// carries exactly one trailing newline, or is empty if no line was produced.
///
/// # Errors
///
/// Propagates [`crate::Error::KeyFile`] when any referenced key file cannot
/// be read. One bad reference aborts the run rather than producing a partial
/// key file.
pub fn render_authorized_keys(server_id: &str, config: &Config) -> Result<String> {
    let mut lines = Vec::new();

    for (name, person) in &config.people {
        if !person.enabled {
            continue;
        }
        if !is_authorized(person, server_id, &config.groups) {
            continue;
        }

        debug!(person = %name, server = %server_id, "adding keys");
        lines.push(format!("# {name}"));
        lines.extend(person.keys.resolve()?);
    }

    // The deployment identity is never subject to enable or access logic
    lines.push(ROOT_KEY_COMMENT.to_string());
    lines.push(KeyRef::classify(&config.root_key.public).resolve()?);

    if lines.is_empty() {
        Ok(String::new())
    } else {
        Ok(lines.join("\n") + "\n")
    }
}

/// Render the SSH client config for every enabled server.
///
/// One `Host` block per enabled server in declaration order, with `Port`
/// emitted only when configured. Disabled servers are omitted entirely.
#[must_use]
pub fn render_ssh_config(config: &Config) -> String {
    let mut lines = Vec::new();
    for (name, server) in config.enabled_servers() {
        lines.push(format!("Host {name}"));
        lines.push(format!("    HostName {}", server.hostname));
        lines.push(format!("    User {}", server.user));
        if let Some(port) = server.port {
            lines.push(format!("    Port {port}"));
        }
        lines.push(String::new());
    }
    lines.join("\n")
}
