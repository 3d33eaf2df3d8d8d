use serde::Serialize;
use uuid::Uuid;

use crate::pipeline::{InputType, Mode, ProgressEntry, ResultBundle};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum RunEvent {
    Started {
        run_id: Uuid,
        input_type: InputType,
        mode: Mode,
    },
    Progress {
        run_id: Uuid,
        entry: ProgressEntry,
    },
    Completed {
        run_id: Uuid,
        result: ResultBundle,
    },
    Failed {
        run_id: Uuid,
        message: String,
    },
    Reset,
}

#[cfg(test)]
mod tests {
    use super::RunEvent;
    use crate::pipeline::{publish, Bilingual, InputType, Mode};
    use serde_json::Value;
    use uuid::Uuid;

    #[test]
    fn run_event_json_shape() {
        let run_id = Uuid::new_v4();

        let started = serde_json::to_value(RunEvent::Started {
            run_id,
            input_type: InputType::Youtube,
            mode: Mode::Fast,
        })
        .expect("serialize");
        assert_eq!(started.get("type").and_then(Value::as_str), Some("started"));
        let payload = started
            .get("payload")
            .and_then(Value::as_object)
            .expect("started payload");
        assert_eq!(
            payload.get("run_id").and_then(Value::as_str),
            Some(run_id.to_string().as_str())
        );
        assert_eq!(
            payload.get("input_type").and_then(Value::as_str),
            Some("youtube")
        );
        assert_eq!(payload.get("mode").and_then(Value::as_str), Some("fast"));

        let bundle = publish(
            Mode::Fast,
            Bilingual::default(),
            Bilingual::new("corto".to_owned(), "short".to_owned()),
            None,
            None,
        );
        let completed = serde_json::to_value(RunEvent::Completed {
            run_id,
            result: bundle,
        })
        .expect("serialize");
        assert_eq!(
            completed.get("type").and_then(Value::as_str),
            Some("completed")
        );
        assert_eq!(
            completed
                .get("payload")
                .and_then(|payload| payload.get("result"))
                .and_then(|result| result.get("summaryEnglish"))
                .and_then(Value::as_str),
            Some("short")
        );

        let reset = serde_json::to_value(RunEvent::Reset).expect("serialize");
        assert_eq!(reset.get("type").and_then(Value::as_str), Some("reset"));
        assert!(reset.get("payload").is_none());
    }
}
