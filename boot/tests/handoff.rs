// Boot handoff, with a recording CPU.

use std::sync::{Mutex, MutexGuard};

use boot::handoff::{self, latched, BootTarget, NVIC_BANKS};
use boot::{enter_xip, Error, MappedFlash, ReadCmdFormat};
use embedded_storage::nor_flash::{ErrorType, ReadNorFlash};
use simflash::gen::GenBuilder;
use simflash::{expect_jump, styles, SimBoard, SimCpu, Step};

// The latch is global.
static LATCH: Mutex<()> = Mutex::new(());

fn latch_lock() -> MutexGuard<'static, ()> {
    LATCH.lock().unwrap_or_else(|e| e.into_inner())
}

fn quiesce_steps() -> Vec<Step> {
    let mut steps = vec![
        Step::DisableMpu,
        Step::DisableDcache,
        Step::DisableIcache,
        Step::DisableInterrupts,
        Step::StopSystick,
    ];
    steps.extend((0..NVIC_BANKS).map(Step::ClearBank));
    steps.push(Step::EnableInterrupts);
    steps
}

#[test]
fn boot_sequence() {
    let _latch = latch_lock();
    let mut cpu = SimCpu::new();

    let entry = expect_jump(|| unsafe { handoff::boot(&mut cpu, 0x2400_0400, 0x9000_0000, 0x7000_0201) });
    assert_eq!(entry, Some(0x7000_0201));

    let mut expected = quiesce_steps();
    expected.push(Step::Start {
        stack_top: 0x2400_0400,
        vector_table: 0x9000_0000,
        entry: 0x7000_0201,
    });
    assert_eq!(cpu.steps, expected);

    assert_eq!(
        latched(),
        BootTarget {
            stack_top: 0x2400_0400,
            vector_table: 0x9000_0000,
            entry: 0x7000_0201,
        }
    );
}

#[test]
fn transfer_uses_latch() {
    let _latch = latch_lock();
    let mut cpu = SimCpu::new();
    let target = BootTarget {
        stack_top: 0x2002_0000,
        vector_table: 0x9000_0000,
        entry: 0x9000_04c1,
    };

    let quiesced = handoff::quiesce(&mut cpu, &target);
    assert_eq!(cpu.steps, quiesce_steps());
    assert_eq!(latched(), target);

    cpu.steps.clear();
    let entry = expect_jump(|| unsafe { quiesced.transfer(&mut cpu) });
    assert_eq!(entry, Some(0x9000_04c1));
    assert_eq!(
        cpu.steps,
        [Step::Start {
            stack_top: 0x2002_0000,
            vector_table: 0x9000_0000,
            entry: 0x9000_04c1,
        }]
    );
}

#[test]
fn chain_from_mapped_flash() {
    let _latch = latch_lock();
    for style in styles::ALL_CHIPS {
        let board = SimBoard::new(style.build(), styles::W25Q16JV.build());
        let img = GenBuilder::default()
            .stack_top(0x2400_0400)
            .entry(0x7000_0201)
            .build()
            .unwrap();
        board.octo.install(&img.data, 0).unwrap();

        let (mut main, _) = board.register().unwrap();
        main.read_cmd_format = Some(ReadCmdFormat {
            instruction: 0xec,
            instruction_lines: 1,
            address_lines: 4,
            data_lines: 4,
            dummy_cycles: 6,
        });
        let mut xip = enter_xip(&mut main).unwrap();
        let base = xip.get_base();

        let mut cpu = SimCpu::new();
        let entry = expect_jump(|| unsafe { handoff::chain(&mut xip, &mut cpu) });
        assert_eq!(entry, Some(0x7000_0201));
        assert_eq!(
            cpu.steps.last(),
            Some(&Step::Start {
                stack_top: 0x2400_0400,
                vector_table: base,
                entry: 0x7000_0201,
            })
        );
        assert_eq!(latched().vector_table, base);
    }
}

/// A mapped flash whose reads fail.
struct Broken;

impl ErrorType for Broken {
    type Error = Error;
}

impl ReadNorFlash for Broken {
    const READ_SIZE: usize = 1;

    fn read(&mut self, _offset: u32, _bytes: &mut [u8]) -> Result<(), Error> {
        Err(Error::Read)
    }

    fn capacity(&self) -> usize {
        0
    }
}

impl MappedFlash for Broken {
    fn get_base(&self) -> usize {
        0x9000_0000
    }
}

#[test]
fn chain_header_failure() {
    let mut cpu = SimCpu::new();
    let result = unsafe { handoff::chain(&mut Broken, &mut cpu) };
    assert_eq!(result.err(), Some(Error::Read));
    assert!(cpu.steps.is_empty());
}
