// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end tests of the adapter over an in-memory transport.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use mqtt_vacuum::protocol::MessageCallback;
use mqtt_vacuum::subscription::Subscribable;
use mqtt_vacuum::{
    Capability, Error, MqttVacuum, ProtocolError, QoS, Signal, SubscriptionToken, TopicRouter,
    Transport, VacuumConfig,
};
use parking_lot::Mutex;

/// A message handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Published {
    topic: String,
    payload: String,
    qos: QoS,
    retain: bool,
}

/// Transport that records publishes and routes injected messages.
#[derive(Default)]
struct RecordingTransport {
    router: TopicRouter,
    published: Mutex<Vec<Published>>,
    /// `+topic` for each subscribe, `-topic` for each unsubscribe.
    subscription_log: Mutex<Vec<String>>,
    topics: Mutex<Vec<(SubscriptionToken, String)>>,
    closed: AtomicBool,
    /// Subscribing to this topic fails.
    refused_topic: Mutex<Option<String>>,
}

impl RecordingTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Delivers a message as if the broker sent it.
    fn deliver(&self, topic: &str, payload: &str) -> bool {
        self.router.route(topic, payload)
    }

    fn published(&self) -> Vec<Published> {
        self.published.lock().clone()
    }

    fn subscription_log(&self) -> Vec<String> {
        self.subscription_log.lock().clone()
    }

    fn active_topics(&self) -> Vec<String> {
        let mut topics: Vec<_> = self.topics.lock().iter().map(|(_, t)| t.clone()).collect();
        topics.sort();
        topics
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn refuse(&self, topic: &str) {
        *self.refused_topic.lock() = Some(topic.to_string());
    }
}

impl Transport for RecordingTransport {
    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        qos: QoS,
        retain: bool,
    ) -> Result<(), ProtocolError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ProtocolError::ChannelClosed("transport closed".to_string()));
        }
        self.published.lock().push(Published {
            topic: topic.to_string(),
            payload: payload.to_string(),
            qos,
            retain,
        });
        Ok(())
    }

    async fn subscribe(
        &self,
        topic: &str,
        _qos: QoS,
        callback: MessageCallback,
    ) -> Result<SubscriptionToken, ProtocolError> {
        if self.refused_topic.lock().as_deref() == Some(topic) {
            return Err(ProtocolError::ConnectionFailed(format!(
                "subscription to {topic} refused"
            )));
        }
        let (token, _) = self.router.add(topic, callback);
        self.subscription_log.lock().push(format!("+{topic}"));
        self.topics.lock().push((token, topic.to_string()));
        Ok(token)
    }

    async fn unsubscribe(&self, tokens: Vec<SubscriptionToken>) -> Result<(), ProtocolError> {
        for token in tokens {
            if let Some((topic, _)) = self.router.remove(token) {
                self.subscription_log.lock().push(format!("-{topic}"));
                self.topics.lock().retain(|(t, _)| *t != token);
            }
        }
        Ok(())
    }
}

fn all_features() -> Vec<&'static str> {
    Capability::ALL.iter().map(|c| c.as_str()).collect()
}

/// A fully featured vacuum reporting everything on one JSON topic.
fn json_config() -> VacuumConfig {
    VacuumConfig::new()
        .with_supported_features(all_features())
        .with_command_topic("vacuum/command")
        .with_set_fan_speed_topic("vacuum/set_fan_speed")
        .with_send_command_topic("vacuum/send_command")
        .with_fan_speed_list(["low", "turbo"])
        .with_state(Signal::BatteryLevel, "vacuum/state", Some("{{ value_json.battery_level }}"))
        .with_state(Signal::Charging, "vacuum/state", Some("{{ value_json.charging }}"))
        .with_state(Signal::Cleaning, "vacuum/state", Some("{{ value_json.cleaning }}"))
        .with_state(Signal::Docked, "vacuum/state", Some("{{ value_json.docked }}"))
        .with_state(Signal::Error, "vacuum/state", Some("{{ value_json.error }}"))
        .with_state(Signal::FanSpeed, "vacuum/state", Some("{{ value_json.fan_speed }}"))
}

async fn attached(
    config: VacuumConfig,
) -> (Arc<RecordingTransport>, MqttVacuum<Arc<RecordingTransport>>) {
    let transport = RecordingTransport::new();
    let vacuum = MqttVacuum::new(Arc::clone(&transport), config).unwrap();
    vacuum.attach().await.unwrap();
    (transport, vacuum)
}

fn count_refreshes<T>(vacuum: &MqttVacuum<T>) -> Arc<AtomicU32> {
    let counter = Arc::new(AtomicU32::new(0));
    let counter_clone = counter.clone();
    vacuum.on_state_changed(move |_| {
        counter_clone.fetch_add(1, Ordering::SeqCst);
    });
    counter
}

// ============================================================================
// Command Dispatch Tests
// ============================================================================

mod commands {
    use super::*;

    #[tokio::test]
    async fn fixed_commands_publish_configured_payloads() {
        let mut config = json_config().with_qos(2).with_retain(true);
        config.payload_locate = "where_are_you".to_string();
        let (transport, vacuum) = attached(config).await;

        vacuum.turn_on().await.unwrap();
        vacuum.turn_off().await.unwrap();
        vacuum.stop().await.unwrap();
        vacuum.clean_spot().await.unwrap();
        vacuum.locate().await.unwrap();
        vacuum.start_pause().await.unwrap();
        vacuum.return_to_base().await.unwrap();

        let payloads: Vec<_> = transport
            .published()
            .into_iter()
            .map(|p| {
                assert_eq!(p.topic, "vacuum/command");
                assert_eq!(p.qos, QoS::ExactlyOnce);
                assert!(p.retain);
                p.payload
            })
            .collect();
        assert_eq!(
            payloads,
            vec![
                "turn_on",
                "turn_off",
                "stop",
                "clean_spot",
                "where_are_you",
                "start_pause",
                "return_to_base",
            ]
        );
    }

    #[tokio::test]
    async fn unsupported_command_is_silent_noop() {
        let config = json_config().with_supported_features(["turn_off", "status"]);
        let (transport, vacuum) = attached(config).await;
        let refreshes = count_refreshes(&vacuum);
        let before = vacuum.status();

        vacuum.turn_on().await.unwrap();

        assert!(transport.published().is_empty());
        assert_eq!(vacuum.status(), before);
        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fan_speed_must_be_in_list() {
        let (transport, vacuum) = attached(json_config()).await;

        vacuum.set_fan_speed("turbo").await.unwrap();
        vacuum.set_fan_speed("max").await.unwrap();

        let published = transport.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "vacuum/set_fan_speed");
        assert_eq!(published[0].payload, "turbo");
        assert_eq!(vacuum.status().as_deref(), Some("setting fan to turbo..."));
    }

    #[tokio::test]
    async fn send_command_publishes_raw_command() {
        let (transport, vacuum) = attached(json_config()).await;

        let mut params = serde_json::Map::new();
        params.insert("speed".to_string(), serde_json::json!(3));
        vacuum.send_command("dock_now", Some(params)).await.unwrap();

        let published = transport.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "vacuum/send_command");
        assert_eq!(published[0].payload, "dock_now");
        assert_eq!(vacuum.status().as_deref(), Some("sending command dock_now..."));
    }

    #[tokio::test]
    async fn optimistic_status_until_telemetry() {
        let (transport, vacuum) = attached(json_config()).await;
        let refreshes = count_refreshes(&vacuum);

        vacuum.return_to_base().await.unwrap();
        assert_eq!(vacuum.status().as_deref(), Some("returning home..."));
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        transport.deliver("vacuum/state", r#"{"docked": true, "charging": true}"#);
        assert_eq!(vacuum.status().as_deref(), Some("docked & charging"));
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn publish_failure_propagates_and_keeps_status() {
        let (transport, vacuum) = attached(json_config()).await;
        transport.close();

        let err = vacuum.turn_on().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::ChannelClosed(_))
        ));
        assert_eq!(vacuum.status().as_deref(), Some("unknown"));
    }

    #[tokio::test]
    async fn command_without_topic_publishes_nothing() {
        let config = VacuumConfig::new().with_supported_features(["turn_on", "status"]);
        let (transport, vacuum) = attached(config).await;

        vacuum.turn_on().await.unwrap();
        assert!(transport.published().is_empty());
        assert_eq!(vacuum.status().as_deref(), Some("unknown"));
    }
}

// ============================================================================
// State Projection Tests
// ============================================================================

mod state_projection {
    use super::*;

    #[tokio::test]
    async fn derived_status_precedence() {
        let (transport, vacuum) = attached(json_config()).await;
        let cases = [
            (r#"{"docked": true, "charging": true}"#, "docked & charging"),
            (r#"{"docked": true, "charging": false}"#, "docked"),
            (r#"{"docked": false, "cleaning": true}"#, "cleaning"),
            (r#"{"cleaning": false, "error": "E1"}"#, "error: E1"),
            (r#"{"error": ""}"#, "stopped"),
            (r#"{"docked": true, "error": "E1"}"#, "docked"),
        ];
        for (payload, status) in cases {
            assert!(transport.deliver("vacuum/state", payload));
            assert_eq!(vacuum.status().as_deref(), Some(status), "{payload}");
        }
    }

    #[tokio::test]
    async fn battery_clamped_on_read_only() {
        let (transport, vacuum) = attached(json_config()).await;

        transport.deliver("vacuum/state", r#"{"battery_level": 150}"#);
        assert_eq!(vacuum.battery_level(), Some(100));
        assert_eq!(vacuum.state().battery_level().raw(), 150);

        transport.deliver("vacuum/state", r#"{"battery_level": -10}"#);
        assert_eq!(vacuum.battery_level(), Some(0));
    }

    #[tokio::test]
    async fn battery_icon_follows_level_and_charging() {
        let (transport, vacuum) = attached(json_config()).await;

        transport.deliver("vacuum/state", r#"{"battery_level": 54, "charging": false}"#);
        assert_eq!(vacuum.battery_icon().as_deref(), Some("mdi:battery-50"));

        transport.deliver("vacuum/state", r#"{"charging": true}"#);
        assert_eq!(
            vacuum.battery_icon().as_deref(),
            Some("mdi:battery-charging-60")
        );
    }

    #[tokio::test]
    async fn separate_topics_per_signal() {
        let config = VacuumConfig::new()
            .with_supported_features(["status", "fan_speed"])
            .with_fan_speed_list(["quiet", "max"])
            .with_state(Signal::Docked, "vacuum/docked", Some("{{ value }}"))
            .with_state(Signal::FanSpeed, "vacuum/fan", Some("{{ value }}"));
        let (transport, vacuum) = attached(config).await;
        assert_eq!(transport.active_topics(), vec!["vacuum/docked", "vacuum/fan"]);

        transport.deliver("vacuum/fan", "max");
        transport.deliver("vacuum/docked", "ON");
        assert_eq!(vacuum.fan_speed().as_deref(), Some("max"));
        assert_eq!(vacuum.status().as_deref(), Some("docked"));
        assert_eq!(vacuum.fan_speed_list(), vec!["quiet", "max"]);
    }

    #[tokio::test]
    async fn invalid_value_keeps_field_and_siblings_apply() {
        let (transport, vacuum) = attached(json_config()).await;
        transport.deliver("vacuum/state", r#"{"battery_level": 40}"#);

        let err = vacuum
            .handle_message(
                "vacuum/state",
                r#"{"battery_level": "high", "fan_speed": "low"}"#,
            )
            .unwrap_err();
        assert!(err.to_string().contains("battery_level"));
        assert_eq!(vacuum.battery_level(), Some(40));
        assert_eq!(vacuum.fan_speed().as_deref(), Some("low"));
    }

    #[tokio::test]
    async fn delivered_invalid_value_still_refreshes() {
        let (transport, vacuum) = attached(json_config()).await;
        let refreshes = count_refreshes(&vacuum);

        assert!(transport.deliver(
            "vacuum/state",
            r#"{"docked": "maybe", "fan_speed": "turbo"}"#
        ));
        assert!(!vacuum.state().is_docked());
        assert_eq!(vacuum.fan_speed().as_deref(), Some("turbo"));
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_json_payload_is_ignored() {
        let (transport, vacuum) = attached(json_config()).await;
        transport.deliver("vacuum/state", r#"{"battery_level": 12}"#);
        transport.deliver("vacuum/state", "not json at all");
        assert_eq!(vacuum.battery_level(), Some(12));
    }

    #[tokio::test]
    async fn unrecognized_topic_still_refreshes() {
        let (_transport, vacuum) = attached(json_config()).await;
        let refreshes = count_refreshes(&vacuum);
        vacuum.turn_on().await.unwrap();
        let before = vacuum.state();

        vacuum
            .handle_message("somewhere/else", r#"{"docked": true}"#)
            .unwrap();

        assert_eq!(vacuum.state(), before);
        assert_eq!(vacuum.status().as_deref(), Some("cleaning"));
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn gated_attributes_hidden() {
        let config = json_config().with_supported_features(["turn_on"]);
        let (transport, vacuum) = attached(config).await;
        transport.deliver(
            "vacuum/state",
            r#"{"battery_level": 80, "cleaning": true, "fan_speed": "low"}"#,
        );

        assert!(vacuum.is_on());
        assert_eq!(vacuum.status(), None);
        assert_eq!(vacuum.battery_level(), None);
        assert_eq!(vacuum.battery_icon(), None);
        assert_eq!(vacuum.fan_speed(), None);
        assert!(vacuum.fan_speed_list().is_empty());
        assert_eq!(vacuum.supported_features().to_strings(), vec!["turn_on"]);
    }

    #[tokio::test]
    async fn refresh_callback_receives_snapshot() {
        let (transport, vacuum) = attached(json_config()).await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        let id = vacuum.on_state_changed(move |snapshot| {
            seen_clone.lock().push(snapshot.status.clone());
        });

        transport.deliver("vacuum/state", r#"{"cleaning": true}"#);
        assert!(vacuum.unsubscribe(id));
        transport.deliver("vacuum/state", r#"{"cleaning": false}"#);

        assert_eq!(*seen.lock(), vec![Some("cleaning".to_string())]);
    }
}

// ============================================================================
// Subscription Management Tests
// ============================================================================

mod subscriptions {
    use super::*;

    #[tokio::test]
    async fn shared_topic_subscribed_once() {
        let (transport, _vacuum) = attached(json_config()).await;
        assert_eq!(transport.active_topics(), vec!["vacuum/state"]);
    }

    #[tokio::test]
    async fn no_state_topics_is_valid() {
        let (transport, vacuum) = attached(VacuumConfig::new()).await;
        assert!(transport.active_topics().is_empty());
        vacuum.attach().await.unwrap();
        assert!(transport.active_topics().is_empty());
    }

    #[tokio::test]
    async fn attach_twice_replaces_subscriptions() {
        let (transport, vacuum) = attached(json_config()).await;
        vacuum.attach().await.unwrap();

        assert_eq!(transport.active_topics(), vec!["vacuum/state"]);
        assert_eq!(
            transport.subscription_log(),
            vec!["+vacuum/state", "-vacuum/state", "+vacuum/state"]
        );
    }

    #[tokio::test]
    async fn disjoint_resubscription() {
        let (transport, vacuum) = attached(json_config()).await;
        let refreshes = count_refreshes(&vacuum);

        let new_config = VacuumConfig::new()
            .with_supported_features(all_features())
            .with_state(Signal::Docked, "robot/docked", Some("{{ value }}"))
            .with_state(Signal::Cleaning, "robot/cleaning", Some("{{ value }}"));
        vacuum.reconfigure(new_config).await.unwrap();

        // Teardown happens before any new subscription is installed
        assert_eq!(
            transport.subscription_log(),
            vec![
                "+vacuum/state",
                "-vacuum/state",
                "+robot/cleaning",
                "+robot/docked",
            ]
        );
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        // Old topic is unreachable
        assert!(!transport.deliver("vacuum/state", r#"{"docked": true}"#));
        assert!(!vacuum.state().is_docked());
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        // New topics reach exactly one callback each
        assert!(transport.deliver("robot/docked", "on"));
        assert!(vacuum.state().is_docked());
        assert_eq!(refreshes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reconfigure_keeps_mirror() {
        let (transport, vacuum) = attached(json_config()).await;
        transport.deliver(
            "vacuum/state",
            r#"{"battery_level": 77, "fan_speed": "turbo", "error": "stuck"}"#,
        );

        vacuum
            .reconfigure(
                json_config()
                    .with_name("Renamed")
                    .with_state(Signal::BatteryLevel, "vacuum/battery", Some("{{ value }}")),
            )
            .await
            .unwrap();

        assert_eq!(vacuum.name(), "Renamed");
        assert_eq!(vacuum.battery_level(), Some(77));
        assert_eq!(vacuum.fan_speed().as_deref(), Some("turbo"));
        assert_eq!(vacuum.state().error(), Some("stuck"));
    }

    #[tokio::test]
    async fn invalid_reconfiguration_changes_nothing() {
        let (transport, vacuum) = attached(json_config()).await;
        let log_before = transport.subscription_log();

        let err = vacuum
            .reconfigure(json_config().with_supported_features(["turn_on", "vacuum_harder"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(mqtt_vacuum::ConfigError::UnknownCapability(_))
        ));
        assert_eq!(transport.subscription_log(), log_before);
        assert_eq!(vacuum.supported_features().to_strings(), all_features());
    }

    #[tokio::test]
    async fn failed_resubscription_restores_previous_config() {
        let old_config = VacuumConfig::new()
            .with_name("Old")
            .with_supported_features(all_features())
            .with_state(Signal::Docked, "old/docked", Some("{{ value }}"))
            .with_availability_topic("old/avail");
        let (transport, vacuum) = attached(old_config).await;
        let refreshes = count_refreshes(&vacuum);
        transport.refuse("bad/topic");

        let err = vacuum
            .reconfigure(
                VacuumConfig::new()
                    .with_name("New")
                    .with_supported_features(all_features())
                    .with_state(Signal::Cleaning, "a/cleaning", Some("{{ value }}"))
                    .with_state(Signal::Docked, "bad/topic", Some("{{ value }}"))
                    .with_availability_topic("new/avail"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::ConnectionFailed(_))
        ));

        // Entirely the old configuration, none of the new
        assert_eq!(vacuum.name(), "Old");
        assert_eq!(transport.active_topics(), vec!["old/avail", "old/docked"]);
        assert!(!transport.deliver("a/cleaning", "on"));
        assert!(transport.deliver("old/docked", "on"));
        assert!(vacuum.state().is_docked());
        // Only the docked message refreshed; the failed attempt did not
        assert_eq!(refreshes.load(Ordering::SeqCst), 1);

        assert!(transport.deliver("old/avail", "online"));
        assert!(vacuum.is_available());
    }

    #[tokio::test]
    async fn failed_attach_leaves_nothing_subscribed() {
        let transport = RecordingTransport::new();
        transport.refuse("vacuum/state");
        let config = json_config().with_availability_topic("vacuum/availability");
        let vacuum = MqttVacuum::new(Arc::clone(&transport), config).unwrap();

        assert!(vacuum.attach().await.is_err());
        assert!(transport.active_topics().is_empty());
    }

    #[tokio::test]
    async fn remove_tears_everything_down() {
        let config = json_config().with_availability_topic("vacuum/availability");
        let (transport, vacuum) = attached(config).await;
        assert_eq!(
            transport.active_topics(),
            vec!["vacuum/availability", "vacuum/state"]
        );

        vacuum.remove().await;
        assert!(transport.active_topics().is_empty());
        assert!(!transport.deliver("vacuum/state", r#"{"cleaning": true}"#));

        // A reconfiguration after removal does not resurrect subscriptions
        vacuum.reconfigure(json_config()).await.unwrap();
        assert!(transport.active_topics().is_empty());
    }
}

// ============================================================================
// Discovery Tests
// ============================================================================

mod discovery {
    use super::*;

    #[tokio::test]
    async fn discovery_payload_reconfigures() {
        let (transport, vacuum) = attached(json_config()).await;

        vacuum
            .discovery_update(
                r#"{
                    "name": "Discovered",
                    "supported_features": ["turn_on", "status", "battery"],
                    "command_topic": "discovered/cmd",
                    "payload_turn_on": "START",
                    "battery_level_topic": "discovered/battery",
                    "battery_level_template": "{{ value_json.level }}",
                    "device": {"manufacturer": "ACME"}
                }"#,
            )
            .await
            .unwrap();

        assert_eq!(vacuum.name(), "Discovered");
        assert_eq!(transport.active_topics(), vec!["discovered/battery"]);

        transport.deliver("discovered/battery", r#"{"level": 33}"#);
        assert_eq!(vacuum.battery_level(), Some(33));

        vacuum.turn_on().await.unwrap();
        let published = transport.published();
        assert_eq!(published.last().map(|p| p.topic.as_str()), Some("discovered/cmd"));
        assert_eq!(published.last().map(|p| p.payload.as_str()), Some("START"));
    }

    #[tokio::test]
    async fn malformed_discovery_keeps_old_config() {
        let (transport, vacuum) = attached(json_config()).await;

        assert!(vacuum.discovery_update("{not json").await.is_err());
        assert!(vacuum
            .discovery_update(r#"{"command_topic": "bad/#"}"#)
            .await
            .is_err());
        assert!(vacuum
            .discovery_update(r#"{"battery_level_template": "{{ value_json.x"}"#)
            .await
            .is_err());
        assert!(vacuum.discovery_update(r#"{"qos": 5}"#).await.is_err());

        assert_eq!(transport.active_topics(), vec!["vacuum/state"]);
        assert!(transport.deliver("vacuum/state", r#"{"cleaning": true}"#));
        assert!(vacuum.is_on());
    }

    #[tokio::test]
    async fn empty_discovery_payload_removes() {
        let (transport, vacuum) = attached(json_config()).await;
        vacuum.discovery_update("").await.unwrap();
        assert!(transport.active_topics().is_empty());
    }
}

// ============================================================================
// Availability Tests
// ============================================================================

mod availability {
    use super::*;

    #[tokio::test]
    async fn available_without_topic() {
        let (_transport, vacuum) = attached(json_config()).await;
        assert!(vacuum.is_available());
        assert!(vacuum.snapshot().available);
    }

    #[tokio::test]
    async fn availability_topic_drives_state() {
        let mut config = json_config().with_availability_topic("vacuum/lwt");
        config.payload_available = "Online".to_string();
        config.payload_not_available = "Offline".to_string();
        let (transport, vacuum) = attached(config).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        vacuum.on_availability_changed(move |available| seen_clone.lock().push(available));

        assert!(!vacuum.is_available());
        transport.deliver("vacuum/lwt", "Online");
        assert!(vacuum.is_available());
        transport.deliver("vacuum/lwt", "garbage");
        assert!(vacuum.is_available());
        transport.deliver("vacuum/lwt", "Offline");
        assert!(!vacuum.is_available());

        assert_eq!(*seen.lock(), vec![true, false]);
    }

    #[tokio::test]
    async fn handle_message_routes_availability() {
        let config = json_config().with_availability_topic("vacuum/availability");
        let transport = RecordingTransport::new();
        let vacuum = MqttVacuum::new(transport, config).unwrap();

        vacuum.handle_message("vacuum/availability", "online").unwrap();
        assert!(vacuum.is_available());
    }
}

// ============================================================================
// Custom Renderer Tests
// ============================================================================

mod custom_renderer {
    use super::*;
    use mqtt_vacuum::{Render, RendererFactory, TemplateError};

    /// Renders `true` when the payload equals the configured word.
    #[derive(Debug)]
    struct WordMatch(String);

    impl Render for WordMatch {
        fn render_with_possible_json_value(&self, payload: &str) -> Option<String> {
            Some((payload.trim() == self.0).to_string())
        }
    }

    /// Accepts sources of the form `is:<word>`.
    fn word_factory() -> RendererFactory {
        Arc::new(|source: &str| -> Result<Arc<dyn Render>, TemplateError> {
            let word = source
                .strip_prefix("is:")
                .ok_or_else(|| TemplateError::new(format!("expected is:<word>, got {source}")))?;
            let renderer: Arc<dyn Render> = Arc::new(WordMatch(word.to_string()));
            Ok(renderer)
        })
    }

    #[tokio::test]
    async fn renderer_survives_reconfiguration() {
        let transport = RecordingTransport::new();
        let config = VacuumConfig::new()
            .with_supported_features(all_features())
            .with_state(Signal::Cleaning, "robot/mode", Some("is:RUNNING"));
        let vacuum =
            MqttVacuum::with_renderer_factory(Arc::clone(&transport), config, word_factory())
                .unwrap();
        vacuum.attach().await.unwrap();

        transport.deliver("robot/mode", "RUNNING");
        assert!(vacuum.is_on());

        vacuum
            .discovery_update(
                r#"{"supported_features": ["turn_on", "status"],
                    "cleaning_topic": "robot/v2/mode",
                    "cleaning_template": "is:CLEANING"}"#,
            )
            .await
            .unwrap();
        assert_eq!(transport.active_topics(), vec!["robot/v2/mode"]);

        transport.deliver("robot/v2/mode", "IDLE");
        assert!(!vacuum.is_on());
        transport.deliver("robot/v2/mode", "CLEANING");
        assert!(vacuum.is_on());
        assert_eq!(vacuum.status().as_deref(), Some("cleaning"));
    }

    #[tokio::test]
    async fn factory_rejection_keeps_config() {
        let transport = RecordingTransport::new();
        let config = VacuumConfig::new()
            .with_state(Signal::Docked, "robot/dock", Some("is:HOME"));
        let vacuum =
            MqttVacuum::with_renderer_factory(Arc::clone(&transport), config, word_factory())
                .unwrap();
        vacuum.attach().await.unwrap();

        let err = vacuum
            .discovery_update(r#"{"docked_topic": "robot/dock", "docked_template": "{{ value }}"}"#)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(mqtt_vacuum::ConfigError::InvalidTemplate { key: "docked_template", .. })
        ));

        transport.deliver("robot/dock", "HOME");
        assert!(vacuum.state().is_docked());
    }
}
