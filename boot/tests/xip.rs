// Memory-mapped mode, against simulated hardware.

use boot::hw::MemoryMappedConfig;
use boot::width::PhaseMode;
use boot::{enter_xip, BootTarget, Error, HwError, MappedFlash, Mode, ReadCmdFormat};
use embedded_storage::nor_flash::ReadNorFlash;
use simflash::chip::{JEDEC_ID, WRITE_ENABLE};
use simflash::gen::GenBuilder;
use simflash::{irq, octo_transport, styles, SimBoard, SimOcto, Stage};
use spiflash::Spi;

/// Quad I/O read, as the driver picks it for these parts.
const QUAD_IO: ReadCmdFormat = ReadCmdFormat {
    instruction: 0xec,
    instruction_lines: 1,
    address_lines: 4,
    data_lines: 4,
    dummy_cycles: 6,
};

fn mapped_bytes(octo: &SimOcto, offset: usize, len: usize) -> Vec<u8> {
    // SAFETY: the simulated window is the chip's memory.
    unsafe { std::slice::from_raw_parts((octo.base() + offset) as *const u8, len) }.to_vec()
}

#[test]
fn boot_header_scenario() {
    for style in styles::ALL_CHIPS {
        let board = SimBoard::new(style.build(), styles::W25Q16JV.build());
        let img = GenBuilder::default()
            .size(4096)
            .stack_top(0x2400_0400)
            .entry(0x7000_0201)
            .build()
            .unwrap();
        board.octo.install(&img.data, 0).unwrap();

        let (mut main, _) = board.register().unwrap();
        main.read_cmd_format = Some(QUAD_IO);
        let mut xip = enter_xip(&mut main).unwrap();
        assert_eq!(xip.transport().mode(), Mode::MemoryMapped);

        let mut header = [0u8; 8];
        xip.read(0, &mut header).unwrap();
        assert_eq!(header, [0x00, 0x04, 0x00, 0x24, 0x01, 0x02, 0x00, 0x70]);

        let target = BootTarget::read(&mut xip).unwrap();
        assert_eq!(target.stack_top, 0x2400_0400);
        assert_eq!(target.entry, 0x7000_0201);
        assert_eq!(target.vector_table, board.octo.base());
        assert_eq!(xip.get_base(), board.octo.base());

        // One command, the continuous read.  Reads came from the window.
        let commands = board.octo.commands();
        assert_eq!(commands.len(), 1);
        let frame = commands[0];
        assert_eq!(frame.instruction, 0xec);
        assert_eq!(frame.instruction_mode, PhaseMode::OneLine);
        assert_eq!(frame.address_mode, PhaseMode::FourLines);
        assert_eq!(frame.data_mode, PhaseMode::FourLines);
        assert_eq!(frame.dummy_cycles, 6);
        assert_eq!(frame.data_len, 0);
        assert_eq!(board.octo.mapped_config(), Some(MemoryMappedConfig::UNBOUNDED));
    }
}

#[test]
fn mapped_reads_are_memory_reads() {
    let octo = SimOcto::new(styles::MX25L3233F.build());
    let img = GenBuilder::default().size(64 * 1024).seed(3).build().unwrap();
    octo.install(&img.data, 0x1_0000).unwrap();
    let mut transport = octo_transport(octo.clone(), None);
    transport.enter_memory_mapped(&QUAD_IO).unwrap();
    let issued = octo.commands().len();

    let window = transport.window();
    for (addr, len) in [(0x1_0000usize, 8usize), (0x1_0123, 1000), (0, 1), (window - 16, 16), (window, 0)] {
        let mut buf = vec![0u8; len];
        transport.fast_read(addr as u32, &QUAD_IO, &mut buf).unwrap();
        assert_eq!(buf, mapped_bytes(&octo, addr, len));
    }
    assert_eq!(octo.commands().len(), issued);

    // Outside the window.
    assert_eq!(transport.fast_read((window - 4) as u32, &QUAD_IO, &mut [0; 8]), Err(Error::Read));
}

#[test]
fn mapped_rejects_commands() {
    let octo = SimOcto::new(styles::W25Q16JV.build());
    let mut transport = octo_transport(octo.clone(), None);
    transport.enter_memory_mapped(&QUAD_IO).unwrap();
    let issued = octo.commands().len();
    let masked = irq::disables();

    assert_eq!(transport.write_then_read(&[WRITE_ENABLE], &mut []), Err(Error::Write));
    assert_eq!(transport.write_then_read(&[JEDEC_ID], &mut [0; 3]), Err(Error::Write));
    assert_eq!(transport.write_then_read(&[0x02, 0, 0, 0, 1, 2, 3], &mut []), Err(Error::Write));
    assert_eq!(transport.write_then_read(&[0x03, 0], &mut [0; 2]), Err(Error::Write));
    assert_eq!(transport.write_then_read(&[], &mut []), Err(Error::Write));

    assert_eq!(octo.commands().len(), issued);
    assert_eq!(transport.mode(), Mode::MemoryMapped);
    assert_eq!(irq::disables(), masked);
}

#[test]
fn enter_exit() {
    let board = SimBoard::new(styles::GD25Q16.build(), styles::GD25Q16.build());
    let (mut main, _) = board.register().unwrap();
    main.read_cmd_format = Some(QUAD_IO);

    let xip = enter_xip(&mut main).unwrap();
    xip.exit();
    assert_eq!(board.octo.aborts(), 1);
    assert!(board.octo.mapped_config().is_none());

    let spi = main.spi().unwrap();
    spi.write_read(&[WRITE_ENABLE], &mut []).unwrap();
    let mut id = [0u8; 3];
    spi.write_read(&[JEDEC_ID], &mut id).unwrap();
    assert_eq!(id, styles::GD25Q16.jedec);

    // And back in.
    let xip = enter_xip(&mut main).unwrap();
    assert_eq!(xip.transport().mode(), Mode::MemoryMapped);
}

#[test]
fn exit_is_idempotent() {
    let octo = SimOcto::new(styles::W25Q16JV.build());
    let mut transport = octo_transport(octo.clone(), None);
    transport.exit_memory_mapped();
    transport.exit_memory_mapped();
    assert_eq!(transport.mode(), Mode::Command);
    transport.write_then_read(&[WRITE_ENABLE], &mut []).unwrap();
}

#[test]
fn enter_twice() {
    let octo = SimOcto::new(styles::W25Q16JV.build());
    let mut transport = octo_transport(octo.clone(), None);
    transport.enter_memory_mapped(&QUAD_IO).unwrap();
    assert_eq!(transport.enter_memory_mapped(&QUAD_IO), Err(Error::Write));
    assert_eq!(transport.mode(), Mode::MemoryMapped);
    assert_eq!(octo.commands().len(), 1);
}

#[test]
fn enter_failures() {
    let octo = SimOcto::new(styles::W25Q16JV.build());
    let mut transport = octo_transport(octo.clone(), None);

    for (stage, error) in [
        (Stage::Command, HwError::Error),
        (Stage::Command, HwError::Timeout),
        (Stage::MemoryMapped, HwError::Error),
        (Stage::MemoryMapped, HwError::Timeout),
    ] {
        octo.fail(stage, error);
        assert_eq!(transport.enter_memory_mapped(&QUAD_IO), Err(Error::Read));
        assert_eq!(transport.mode(), Mode::Command);
    }
    assert!(irq::enabled());

    let bad = ReadCmdFormat { address_lines: 3, ..QUAD_IO };
    assert_eq!(transport.enter_memory_mapped(&bad), Err(Error::Configuration));

    transport.enter_memory_mapped(&QUAD_IO).unwrap();
    assert_eq!(transport.mode(), Mode::MemoryMapped);
}

#[test]
fn enter_xip_needs_main_and_descriptor() {
    let board = SimBoard::new(styles::W25Q16JV.build(), styles::W25Q16JV.build());
    let (mut main, mut ext) = board.register().unwrap();

    assert_eq!(enter_xip(&mut main).err(), Some(Error::Configuration));

    ext.read_cmd_format = Some(QUAD_IO);
    assert_eq!(enter_xip(&mut ext).err(), Some(Error::Configuration));

    assert!(board.octo.commands().is_empty());
}

#[test]
fn xip_flash_view() {
    let board = SimBoard::new(styles::MX25L3233F.build(), styles::W25Q16JV.build());
    let img = GenBuilder::default().size(1024).seed(9).build().unwrap();
    board.octo.install(&img.data, 0x100).unwrap();
    let (mut main, _) = board.register().unwrap();
    main.read_cmd_format = Some(QUAD_IO);

    let mut xip = enter_xip(&mut main).unwrap();
    assert_eq!(xip.capacity(), styles::MX25L3233F.capacity);

    let mut buf = [0u8; 512];
    xip.read(0x100, &mut buf).unwrap();
    assert_eq!(&buf[..], &img.data[..512]);

    let end = xip.capacity() as u32;
    assert_eq!(xip.read(end, &mut [0; 1]), Err(Error::Read));
}
