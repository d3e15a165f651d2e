//! Vendor request binding for [`usb_device`].
//!
//! Add the [`Controller`] to the class list passed to `UsbDevice::poll`. Device-recipient
//! vendor requests are answered here; everything else is left to other classes.

use crate::{BusLines, Controller, FanOutputs, GuideOutputs, Reply};
use usb_device::{
    class_prelude::*,
    control::{Recipient, Request, RequestType},
};

/// How a control transfer is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Answer {
    /// Not ours; another class may take it.
    Ignore,
    /// Accept with the first `len` bytes of the reply as data stage.
    Accept(Reply, usize),
    /// Answer with a STALL.
    Stall,
}

impl<L: BusLines, G: GuideOutputs, F: FanOutputs> Controller<L, G, F> {
    fn answer(&mut self, req: &Request) -> Answer {
        if req.request_type != RequestType::Vendor || req.recipient != Recipient::Device {
            return Answer::Ignore;
        }
        match self.handle(req.request, req.value, req.index) {
            Ok(reply) => {
                let len = reply.as_bytes().len().min(req.length as usize);
                Answer::Accept(reply, len)
            }
            Err(e) => {
                log::debug!("rejected request {}: {e}", req.request);
                Answer::Stall
            }
        }
    }
}

impl<B, L, G, F> UsbClass<B> for Controller<L, G, F>
where
    B: UsbBus,
    L: BusLines,
    G: GuideOutputs,
    F: FanOutputs,
{
    fn control_in(&mut self, xfer: ControlIn<B>) {
        let req = *xfer.request();
        match self.answer(&req) {
            Answer::Ignore => {}
            Answer::Accept(reply, len) => {
                xfer.accept_with(&reply.as_bytes()[..len]).ok();
            }
            Answer::Stall => {
                xfer.reject().ok();
            }
        }
    }

    fn control_out(&mut self, xfer: ControlOut<B>) {
        let req = *xfer.request();
        match self.answer(&req) {
            Answer::Ignore => {}
            Answer::Accept(..) => {
                xfer.accept().ok();
            }
            Answer::Stall => {
                xfer.reject().ok();
            }
        }
    }
}
