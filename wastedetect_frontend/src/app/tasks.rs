use std::sync::mpsc::Sender;
use std::thread;

use log::error;

use crate::api::DetectionApi;
use crate::validation::ImageUpload;

use super::messages::AppMessage;

pub fn check_health<A: DetectionApi>(api: A, tx: Sender<AppMessage>, generation: u64) {
    thread::spawn(move || {
        let result = api.check_health();
        if tx
            .send(AppMessage::HealthChecked { generation, result })
            .is_err()
        {
            error!("failed to send HealthChecked message");
        }
    });
}

pub fn submit_image<A: DetectionApi>(
    api: A,
    tx: Sender<AppMessage>,
    generation: u64,
    upload: ImageUpload,
) {
    thread::spawn(move || {
        let result = api.submit_image(&upload);
        let message = AppMessage::DetectionFinished {
            generation,
            file_name: upload.file_name,
            result,
        };
        if tx.send(message).is_err() {
            error!("failed to send DetectionFinished message");
        }
    });
}
