mod fiber_tests;
