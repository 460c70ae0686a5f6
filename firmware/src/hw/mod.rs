#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! 74HC595 shift register driving the light tower.
//!
//! Each flush latches one byte, most significant bit first, so the bit layout
//! of [`LightMask`] maps directly onto outputs Q7..Q1.

use lights_core::controller::LightDriver;
use lights_core::lights::LightMask;

#[cfg(target_os = "none")]
use embassy_stm32::gpio::Output;

/// Push-pull line the shift register is clocked through.
pub trait ShiftPin {
    fn set_high(&mut self);
    fn set_low(&mut self);

    fn set_level(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}

#[cfg(target_os = "none")]
impl ShiftPin for Output<'_> {
    fn set_high(&mut self) {
        Output::set_high(self);
    }

    fn set_low(&mut self) {
        Output::set_low(self);
    }
}

/// Bit-banged serial-in/parallel-out register.
pub struct ShiftRegister<P> {
    latch: P,
    clock: P,
    data: P,
}

impl<P: ShiftPin> ShiftRegister<P> {
    /// Takes the three control lines and drives every output low.
    pub fn new(latch: P, clock: P, data: P) -> Self {
        let mut register = Self { latch, clock, data };
        register.clock.set_low();
        register.shift_byte(0);
        register
    }

    fn shift_byte(&mut self, value: u8) {
        self.latch.set_low();
        for bit in (0..8).rev() {
            self.data.set_level(value & (1 << bit) != 0);
            self.clock.set_high();
            self.clock.set_low();
        }
        self.latch.set_high();
    }
}

impl<P: ShiftPin> LightDriver for ShiftRegister<P> {
    fn write_mask(&mut self, mask: LightMask) {
        self.shift_byte(mask.bits());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::RefCell;
    use heapless::Vec;
    use lights_core::lights::Light;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    enum Line {
        Latch,
        Clock,
        Data,
    }

    type Trace = RefCell<Vec<(Line, bool), 128>>;

    struct TracePin<'a> {
        line: Line,
        trace: &'a Trace,
    }

    impl ShiftPin for TracePin<'_> {
        fn set_high(&mut self) {
            self.trace.borrow_mut().push((self.line, true)).unwrap();
        }

        fn set_low(&mut self) {
            self.trace.borrow_mut().push((self.line, false)).unwrap();
        }
    }

    fn register(trace: &Trace) -> ShiftRegister<TracePin<'_>> {
        ShiftRegister::new(
            TracePin {
                line: Line::Latch,
                trace,
            },
            TracePin {
                line: Line::Clock,
                trace,
            },
            TracePin {
                line: Line::Data,
                trace,
            },
        )
    }

    /// Data level sampled on every rising clock edge.
    fn clocked_bits(trace: &[(Line, bool)]) -> Vec<bool, 16> {
        let mut data = false;
        let mut bits = Vec::new();
        for &(line, high) in trace {
            match line {
                Line::Data => data = high,
                Line::Clock if high => bits.push(data).unwrap(),
                _ => {}
            }
        }
        bits
    }

    #[test]
    fn init_shifts_out_zero() {
        let trace = Trace::default();
        let _register = register(&trace);

        let trace = trace.borrow();
        assert_eq!(clocked_bits(&trace).as_slice(), &[false; 8]);
        assert_eq!(trace.last(), Some(&(Line::Latch, true)));
    }

    #[test]
    fn mask_is_sent_msb_first() {
        let trace = Trace::default();
        let mut register = register(&trace);
        trace.borrow_mut().clear();

        register.write_mask(LightMask::EMPTY.with(Light::White).with(Light::Yellow3));

        let trace = trace.borrow();
        assert_eq!(trace.first(), Some(&(Line::Latch, false)));
        assert_eq!(
            clocked_bits(&trace).as_slice(),
            &[true, false, false, false, false, false, true, false]
        );
        assert_eq!(trace.last(), Some(&(Line::Latch, true)));
    }
}
